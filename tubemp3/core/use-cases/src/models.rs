pub mod events {
    use crate::models::descriptors::PartiallyResolvedVideo;
    use crate::models::descriptors::ResolvedVideo;
    use crate::models::descriptors::Step;
    use crate::utils::aliases::MaybeOwnedString;

    #[derive(Debug, Clone)]
    pub enum PipelineEvent {
        StepStarted(StepStartedEvent),
        StepCompleted(StepCompletedEvent),
        Skipped(PipelineSkippedEvent),
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct StepStartedEvent {
        pub step: Step,
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct StepCompletedEvent {
        pub step: Step,

        #[builder(into)]
        pub summary: MaybeOwnedString,
    }

    /// The audio is already on disk; no step was run.
    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct PipelineSkippedEvent {
        pub video: ResolvedVideo,
    }

    #[derive(Debug, Clone)]
    pub enum AudioDownloadEvent {
        Started(AudioDownloadStartedEvent),
        ProgressUpdated(AudioDownloadProgressUpdatedEvent),
        Completed(AudioDownloadCompletedEvent),
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct AudioDownloadStartedEvent {
        pub video: PartiallyResolvedVideo,
        pub total_bytes: Option<u64>,
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct AudioDownloadProgressUpdatedEvent {
        pub downloaded_bytes: u64,
        pub total_bytes: Option<u64>,
        pub elapsed: ::std::time::Duration,
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct AudioDownloadCompletedEvent {
        pub video: ResolvedVideo,
        pub downloaded_bytes: u64,
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct DiagnosticEvent {
        pub level: DiagnosticLevel,

        #[builder(into)]
        pub message: MaybeOwnedString,
    }

    /// Problems the pipeline recovers from. Fatal ones end the run as an error.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DiagnosticLevel {
        Warning,
    }
}

pub mod descriptors {
    use ::domain::VideoId;
    use ::domain::VideoMetadata;
    use ::domain::VideoUrl;

    use crate::utils::aliases::MaybeOwnedString;

    /// A video whose metadata is known but whose audio is not on disk yet.
    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct PartiallyResolvedVideo {
        pub id: VideoId,
        pub url: VideoUrl,

        #[builder(default)]
        pub metadata: VideoMetadata,
    }

    pub type ResolvedVideo = ::domain::Video;

    /// Location of a converted MP3 file on the backend's CDN.
    pub type Mp3Url = MaybeOwnedString;

    #[derive(Debug, Clone)]
    pub enum CacheLookup {
        Hit(CachedAudio),
        Miss(CacheMiss),
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct CachedAudio {
        #[builder(into)]
        pub mp3_url: Mp3Url,

        #[builder(default)]
        pub metadata: VideoMetadata,
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct CacheMiss {
        #[builder(into)]
        pub reason: MaybeOwnedString,
    }

    #[derive(Debug, Clone, ::bon::Builder)]
    pub struct Acknowledgement {
        #[builder(into)]
        pub message: MaybeOwnedString,
    }

    /// The five calls of a conversion, in the order they run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Step {
        CheckDatabase,
        GetVideoData,
        DownloadVideo,
        InsertToDatabase,
        DownloadFile,
    }

    impl Step {
        pub const ALL: [Step; 5] = [
            Step::CheckDatabase,
            Step::GetVideoData,
            Step::DownloadVideo,
            Step::InsertToDatabase,
            Step::DownloadFile,
        ];

        pub const fn ordinal(self) -> usize {
            match self {
                Step::CheckDatabase => 1,
                Step::GetVideoData => 2,
                Step::DownloadVideo => 3,
                Step::InsertToDatabase => 4,
                Step::DownloadFile => 5,
            }
        }

        pub const fn description(self) -> &'static str {
            match self {
                Step::CheckDatabase => "check database",
                Step::GetVideoData => "get video data",
                Step::DownloadVideo => "convert video",
                Step::InsertToDatabase => "insert to database",
                Step::DownloadFile => "download file",
            }
        }
    }

    impl ::std::fmt::Display for Step {
        fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
            write!(formatter, "step {}/{} ({})", self.ordinal(), Self::ALL.len(), self.description())
        }
    }
}

pub mod errors {
    use crate::models::descriptors::Step;
    use crate::utils::aliases::MaybeOwnedString;

    /// A pipeline step that did not produce what the next step needs.
    ///
    /// `status` is the HTTP status of the failing response, when one was received.
    #[derive(Debug, Clone, ::thiserror::Error)]
    #[error("{step} failed{}: {message}", describe_status(.status))]
    pub struct StepError {
        pub step: Step,
        pub status: Option<u16>,
        pub message: MaybeOwnedString,
    }

    impl StepError {
        pub fn new<Message>(step: Step, status: Option<u16>, message: Message) -> Self
        where
            Message: Into<MaybeOwnedString>,
        {
            Self { step, status, message: message.into() }
        }
    }

    fn describe_status(status: &Option<u16>) -> String {
        status
            .map(|status| format!(" with HTTP status {}", status))
            .unwrap_or_default()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn displays_failing_step_and_status() {
            let error = StepError::new(Step::DownloadVideo, Some(502), "bad gateway");
            assert_eq!(error.to_string(), "step 3/5 (convert video) failed with HTTP status 502: bad gateway");

            let error = StepError::new(Step::CheckDatabase, None, "connection refused");
            assert_eq!(error.to_string(), "step 1/5 (check database) failed: connection refused");
        }
    }
}
