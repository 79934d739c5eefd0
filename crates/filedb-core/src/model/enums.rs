//! Enumerated column domains. The string values are the database values and
//! must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! column_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every value of the domain, in schema order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The database value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("invalid {}: {other:?}", stringify!($name))),
                }
            }
        }
    };
}

column_enum!(
    /// `storage.files.validity`
    Validity {
        SeeminglyValid => "seemingly_valid",
        FullyValid => "fully_valid",
        CannotRead => "cannot_read",
        PartiallyRecoverable => "partially_recoverable",
        NotSet => "not_set",
    }
);

impl Default for Validity {
    fn default() -> Self {
        Self::NotSet
    }
}

column_enum!(
    /// `content.image_file_infos.image_type`
    ImageType {
        Jpg => "jpg",
        Png => "png",
        SingleImageTiff => "single_image_tiff",
        Jp2 => "jp2",
        Raw => "raw",
    }
);

column_enum!(
    /// `content.image_file_infos.image_mode`
    ImageMode {
        Bilevel => "1",
        L => "L",
        Rgb => "RGB",
        Rgba => "RGBA",
        Cmyk => "CMYK",
        P => "P",
        Other => "OTHER",
    }
);

column_enum!(
    /// `content.image_file_infos.tiff_compression`
    TiffCompression {
        Raw => "raw",
        TiffCcitt => "tiff_ccitt",
        Group3 => "group3",
        Group4 => "group4",
        TiffLzw => "tiff_lzw",
        TiffJpeg => "tiff_jpeg",
        Jpeg => "jpeg",
        TiffAdobeDeflate => "tiff_adobe_deflate",
        Lzma => "lzma",
        Other => "other",
    }
);

impl TiffCompression {
    /// Map a TIFF `Compression` tag value.
    pub fn from_tag(code: u32) -> Self {
        match code {
            1 => Self::Raw,
            2 => Self::TiffCcitt,
            3 => Self::Group3,
            4 => Self::Group4,
            5 => Self::TiffLzw,
            6 => Self::TiffJpeg,
            7 => Self::Jpeg,
            8 => Self::TiffAdobeDeflate,
            34925 => Self::Lzma,
            _ => Self::Other,
        }
    }
}

column_enum!(
    /// `storage.paths.root_folder`
    RootFolder {
        Images => "images",
        Archive => "archive",
        Sources => "sources",
        Backup => "backup",
        EBooks => "eBooks",
        Web => "web",
        Other => "other",
    }
);

impl RootFolder {
    /// Category of a content path, from its first component.
    ///
    /// Matching is case sensitive, as content paths are. Anything that is not
    /// one of the known folders is `other`.
    pub fn from_content_path(path: &str) -> Self {
        let first = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        first.parse::<Self>().unwrap_or(Self::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_values_preserved() {
        let values: Vec<_> = Validity::ALL.iter().map(|v| v.as_str()).collect();
        assert_eq!(
            values,
            [
                "seemingly_valid",
                "fully_valid",
                "cannot_read",
                "partially_recoverable",
                "not_set"
            ]
        );
        assert_eq!(Validity::default(), Validity::NotSet);
    }

    #[test]
    fn test_image_mode_serde_uses_database_values() {
        assert_eq!(serde_json::to_string(&ImageMode::Bilevel).unwrap(), "\"1\"");
        assert_eq!(serde_json::to_string(&ImageMode::Other).unwrap(), "\"OTHER\"");
        let parsed: ImageMode = serde_json::from_str("\"CMYK\"").unwrap();
        assert_eq!(parsed, ImageMode::Cmyk);
    }

    #[test]
    fn test_tiff_compression_codes() {
        assert_eq!(TiffCompression::from_tag(1), TiffCompression::Raw);
        assert_eq!(TiffCompression::from_tag(4), TiffCompression::Group4);
        assert_eq!(TiffCompression::from_tag(5), TiffCompression::TiffLzw);
        assert_eq!(TiffCompression::from_tag(34925), TiffCompression::Lzma);
        assert_eq!(TiffCompression::from_tag(32773), TiffCompression::Other);
        assert_eq!(TiffCompression::TiffAdobeDeflate.as_str(), "tiff_adobe_deflate");
    }

    #[test]
    fn test_root_folder_from_content_path() {
        assert_eq!(
            RootFolder::from_content_path("images/W22084-I0886/I08860001.tif"),
            RootFolder::Images
        );
        assert_eq!(RootFolder::from_content_path("eBooks/W22084.epub"), RootFolder::EBooks);
        assert_eq!(RootFolder::from_content_path("ebooks/W22084.epub"), RootFolder::Other);
        assert_eq!(RootFolder::from_content_path("misc/readme.txt"), RootFolder::Other);
        assert_eq!(RootFolder::from_content_path(""), RootFolder::Other);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("gif".parse::<ImageType>().is_err());
        assert_eq!("jp2".parse::<ImageType>().unwrap(), ImageType::Jp2);
    }
}
