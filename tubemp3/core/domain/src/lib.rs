pub(crate) mod utils;

use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;

macro_rules! lazy_regex {
    ($pattern:expr) => {
        ::once_cell::sync::Lazy::new(|| ::regex::Regex::new($pattern).unwrap())
    };
}

#[derive(Debug, Clone, ::bon::Builder)]
pub struct Video {
    pub id: VideoId,
    pub url: VideoUrl,

    #[builder(default)]
    pub metadata: VideoMetadata,

    #[builder(into)]
    pub path: MaybeOwnedPath,
}

pub type VideoId = MaybeOwnedString;

#[derive(Debug, Clone, Default, PartialEq, Eq, ::bon::Builder)]
pub struct VideoMetadata {
    #[builder(into)]
    pub title: Option<MaybeOwnedString>,
}

/// A YouTube video URL, validated and reduced to the video id it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl {
    url: MaybeOwnedString,
    kind: VideoUrlKind,
    id: VideoId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoUrlKind {
    /// `youtube.com/watch?v=<id>`
    Regular,
    /// `youtube.com/shorts/<id>`
    Short,
    /// `youtube.com/embed/<id>`
    Embed,
    /// `youtu.be/<id>`
    Shortened,
}

#[derive(Debug, Clone, PartialEq, Eq, ::thiserror::Error)]
pub enum UrlError {
    #[error("not a YouTube URL: {0}")]
    NotYoutube(MaybeOwnedString),

    #[error("YouTube URL does not point at a single video: {0}")]
    UnsupportedPath(MaybeOwnedString),
}

impl VideoUrl {
    pub fn parse<Url>(url: Url) -> Result<Self, UrlError>
    where
        Url: Into<MaybeOwnedString>,
    {
        static VIDEO_URL_REGEX: ::once_cell::sync::Lazy<::regex::Regex> = lazy_regex!(
            r"^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=(?P<regular>[A-Za-z0-9_-]{11})|shorts/(?P<short>[A-Za-z0-9_-]{11})|embed/(?P<embed>[A-Za-z0-9_-]{11}))|youtu\.be/(?P<shortened>[A-Za-z0-9_-]{11}))(?:[?&#/]\S*)?$"
        );

        static YOUTUBE_HOST_REGEX: ::once_cell::sync::Lazy<::regex::Regex> = lazy_regex!(
            r"^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube\.com|youtu\.be)(?:[/?#]|$)"
        );

        let url: MaybeOwnedString = url.into();
        let trimmed = url.trim();

        let Some(captures) = VIDEO_URL_REGEX.captures(trimmed) else {
            return Err(if YOUTUBE_HOST_REGEX.is_match(trimmed) {
                UrlError::UnsupportedPath(url)
            } else {
                UrlError::NotYoutube(url)
            });
        };

        let (kind, id) = [
            (VideoUrlKind::Regular, "regular"),
            (VideoUrlKind::Short, "short"),
            (VideoUrlKind::Embed, "embed"),
            (VideoUrlKind::Shortened, "shortened"),
        ]
        .into_iter()
        .find_map(|(kind, group)| captures.name(group).map(|id| (kind, id.as_str().to_owned())))
        .ok_or_else(|| UrlError::UnsupportedPath(url.clone()))?;

        Ok(Self {
            url: trimmed.to_owned().into(),
            kind,
            id: id.into(),
        })
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn kind(&self) -> VideoUrlKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The `watch?v=` form of this URL, whatever shape it was given in.
    pub fn canonical(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl ::std::str::FromStr for VideoUrl {
    type Err = UrlError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        Self::parse(url.to_owned())
    }
}

impl ::std::fmt::Display for VideoUrl {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{}", self.url)
    }
}

impl ::std::fmt::Display for VideoUrlKind {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        let kind = match self {
            VideoUrlKind::Regular => "regular",
            VideoUrlKind::Short => "shorts",
            VideoUrlKind::Embed => "embed",
            VideoUrlKind::Shortened => "short link",
        };

        write!(formatter, "{}", kind)
    }
}

/// Audio bitrates offered by the conversion backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bitrate {
    Kbps320,
    Kbps256,
    #[default]
    Kbps128,
    Kbps96,
}

#[derive(Debug, Clone, PartialEq, Eq, ::thiserror::Error)]
#[error("unsupported bitrate {0} kb/s (expected one of 320, 256, 128, 96)")]
pub struct BitrateError(pub u16);

impl Bitrate {
    pub const ALL: [Bitrate; 4] = [Bitrate::Kbps320, Bitrate::Kbps256, Bitrate::Kbps128, Bitrate::Kbps96];

    pub fn from_kbps(kbps: u16) -> Result<Self, BitrateError> {
        Self::ALL
            .into_iter()
            .find(|bitrate| bitrate.kbps() == kbps)
            .ok_or(BitrateError(kbps))
    }

    pub const fn kbps(self) -> u16 {
        match self {
            Bitrate::Kbps320 => 320,
            Bitrate::Kbps256 => 256,
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps96 => 96,
        }
    }

    /// Value of the `quality` field the backend expects for this bitrate.
    pub const fn code(self) -> u8 {
        match self {
            Bitrate::Kbps320 => 0,
            Bitrate::Kbps256 => 1,
            Bitrate::Kbps128 => 4,
            Bitrate::Kbps96 => 5,
        }
    }
}

impl TryFrom<u16> for Bitrate {
    type Error = BitrateError;

    fn try_from(kbps: u16) -> Result<Self, Self::Error> {
        Self::from_kbps(kbps)
    }
}

impl ::std::fmt::Display for Bitrate {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{} kb/s", self.kbps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_video_url_shape() {
        let cases = [
            ("https://www.youtube.com/watch?v=yPvoKz6tyJs", VideoUrlKind::Regular, "yPvoKz6tyJs"),
            ("https://www.youtube.com/watch?list=PL0123&v=yPvoKz6tyJs&t=10s", VideoUrlKind::Regular, "yPvoKz6tyJs"),
            ("https://m.youtube.com/watch?v=yPvoKz6tyJs", VideoUrlKind::Regular, "yPvoKz6tyJs"),
            ("https://www.youtube.com/shorts/3rLN_-VNcfs", VideoUrlKind::Short, "3rLN_-VNcfs"),
            ("https://youtube.com/shorts/3rLN_-VNcfs?feature=share", VideoUrlKind::Short, "3rLN_-VNcfs"),
            ("https://www.youtube.com/embed/3rLN_-VNcfs", VideoUrlKind::Embed, "3rLN_-VNcfs"),
            ("https://youtu.be/yPvoKz6tyJs?t=42", VideoUrlKind::Shortened, "yPvoKz6tyJs"),
            ("youtu.be/yPvoKz6tyJs", VideoUrlKind::Shortened, "yPvoKz6tyJs"),
        ];

        for (url, kind, id) in cases {
            let parsed = VideoUrl::parse(url).unwrap_or_else(|err| panic!("{url}: {err}"));

            assert_eq!(parsed.kind(), kind, "{url}");
            assert_eq!(&**parsed.id(), id, "{url}");
        }
    }

    #[test]
    fn rejects_youtube_urls_without_a_video() {
        for url in [
            "https://www.youtube.com/invalid/invalid",
            "https://www.youtube.com/watch?v=tooshort",
            "https://www.youtube.com/watch?v=yPvoKz6tyJsX",
            "https://www.youtube.com/",
        ] {
            assert!(matches!(VideoUrl::parse(url), Err(UrlError::UnsupportedPath(_))), "{url}");
        }
    }

    #[test]
    fn rejects_other_hosts() {
        for url in ["https://vimeo.com/123456789", "not a url", "https://notyoutube.com/watch?v=yPvoKz6tyJs"] {
            assert!(matches!(VideoUrl::parse(url), Err(UrlError::NotYoutube(_))), "{url}");
        }
    }

    #[test]
    fn canonicalizes_to_watch_url() {
        let url: VideoUrl = "https://youtube.com/shorts/3rLN_-VNcfs?feature=share".parse().unwrap();

        assert_eq!(url.canonical(), "https://www.youtube.com/watch?v=3rLN_-VNcfs");
        assert_eq!(url.as_str(), "https://youtube.com/shorts/3rLN_-VNcfs?feature=share");
        assert_eq!(url.to_string(), url.as_str());
        assert_eq!(url.kind().to_string(), "shorts");
        assert_eq!(VideoUrlKind::Shortened.to_string(), "short link");
    }

    #[test]
    fn bitrate_maps_kbps_to_backend_codes() {
        let cases = [(320, 0), (256, 1), (128, 4), (96, 5)];

        for (kbps, code) in cases {
            let bitrate = Bitrate::from_kbps(kbps).unwrap();

            assert_eq!(bitrate.kbps(), kbps);
            assert_eq!(bitrate.code(), code);
        }

        assert_eq!(Bitrate::default(), Bitrate::Kbps128);
        assert_eq!(Bitrate::try_from(192_u16), Err(BitrateError(192)));
    }
}
