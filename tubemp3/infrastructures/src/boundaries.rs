use ::async_trait::async_trait;
use ::use_cases::boundaries::Activate;
use ::use_cases::boundaries::AudioSource;
use ::use_cases::boundaries::ConvertVideoResponseModel;
use ::use_cases::boundaries::Update;
use ::use_cases::models::descriptors::Step;
use ::use_cases::models::events::AudioDownloadCompletedEvent;
use ::use_cases::models::events::AudioDownloadEvent;
use ::use_cases::models::events::AudioDownloadProgressUpdatedEvent;
use ::use_cases::models::events::AudioDownloadStartedEvent;
use ::use_cases::models::events::DiagnosticEvent;
use ::use_cases::models::events::DiagnosticLevel;
use ::use_cases::models::events::PipelineEvent;
use ::use_cases::models::events::PipelineSkippedEvent;
use ::use_cases::models::events::StepCompletedEvent;
use ::use_cases::models::events::StepStartedEvent;

use crate::utils::aliases::Fallible;

macro_rules! lazy_progress_style {
    ($template:expr) => {
        ::once_cell::sync::Lazy::new(|| ::indicatif::ProgressStyle::with_template($template).unwrap())
    };
}

macro_rules! lazy_color {
    ($color:expr) => {
        ::once_cell::sync::Lazy::new(|| {
            use ::colored::Colorize as _;

            $color
        })
    };
}

/// Terminal view of one conversion: a bar over the five steps, then a byte
/// progress bar while the audio downloads.
pub struct ConvertVideoView {
    progress_bars: ::indicatif::MultiProgress,
    step_progress_bar: ::indicatif::ProgressBar,
    audio_progress_bar: ::indicatif::ProgressBar,
}

impl ConvertVideoView {
    pub fn new() -> Fallible<Self> {
        static STEP_PROGRESS_BAR_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
            lazy_progress_style!("{prefix} {bar:20} {msg}");
        static AUDIO_PROGRESS_BAR_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
            lazy_progress_style!("{prefix} {bar:50} {msg}");

        let progress_bars = ::indicatif::MultiProgress::new();
        progress_bars.set_draw_target(::indicatif::ProgressDrawTarget::hidden());

        let step_progress_bar = progress_bars.add(
            ::indicatif::ProgressBar::new(Step::ALL.len() as u64).with_style(STEP_PROGRESS_BAR_STYLE.clone()),
        );
        step_progress_bar.disable_steady_tick();

        let audio_progress_bar = ::indicatif::ProgressBar::new(100).with_style(AUDIO_PROGRESS_BAR_STYLE.clone());
        audio_progress_bar.disable_steady_tick();
        audio_progress_bar.set_prefix(format!(
            "{:<24} {}",
            format!("{} @ {}", FormattedUninitBytes, FormattedUninitBytesPerSecond),
            FormattedUninitDuration
        ));
        audio_progress_bar.set_message(format!("{}", FormattedUninitPercentage));

        Ok(Self { progress_bars, step_progress_bar, audio_progress_bar })
    }
}

#[async_trait]
impl Activate for ConvertVideoView {
    async fn activate(self: ::std::sync::Arc<Self>) -> Fallible<()> {
        self.progress_bars.set_draw_target(::indicatif::ProgressDrawTarget::stderr());
        self.step_progress_bar.tick();

        Ok(())
    }

    async fn deactivate(self: ::std::sync::Arc<Self>) -> Fallible<()> {
        if !self.step_progress_bar.is_finished() {
            self.step_progress_bar.abandon();
        }
        self.progress_bars.set_draw_target(::indicatif::ProgressDrawTarget::hidden());

        Ok(())
    }
}

#[async_trait]
impl Update<PipelineEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &PipelineEvent) -> Fallible<()> {
        match event {
            PipelineEvent::StepStarted(event) => self.update(event).await,
            PipelineEvent::StepCompleted(event) => self.update(event).await,
            PipelineEvent::Skipped(event) => self.update(event).await,
        }
    }
}

#[async_trait]
impl Update<StepStartedEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &StepStartedEvent) -> Fallible<()> {
        let StepStartedEvent { step } = event;

        self.step_progress_bar.set_position(step.ordinal() as u64 - 1);
        self.step_progress_bar.set_prefix(format!("{}", FormattedStep(*step)));
        self.step_progress_bar.set_message(format!("{}...", step.description()));

        Ok(())
    }
}

#[async_trait]
impl Update<StepCompletedEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &StepCompletedEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let StepCompletedEvent { step, summary } = event;

        self.step_progress_bar.set_position(step.ordinal() as u64);
        self.step_progress_bar.println(format!(
            "{} {} {}",
            format!("{}", FormattedStep(*step)).green(),
            step.description(),
            summary.color(GRAY)
        ));

        Ok(())
    }
}

#[async_trait]
impl Update<PipelineSkippedEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &PipelineSkippedEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let PipelineSkippedEvent { video } = event;

        self.step_progress_bar.finish_and_clear();
        self.step_progress_bar.println(format!(
            "Already downloaded: {} {}",
            video.path.display().to_string().white().bold(),
            "(use --force to convert again)".color(GRAY)
        ));

        Ok(())
    }
}

#[async_trait]
impl Update<AudioDownloadEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &AudioDownloadEvent) -> Fallible<()> {
        match event {
            AudioDownloadEvent::Started(event) => self.update(event).await,
            AudioDownloadEvent::ProgressUpdated(event) => self.update(event).await,
            AudioDownloadEvent::Completed(event) => self.update(event).await,
        }
    }
}

#[async_trait]
impl Update<AudioDownloadStartedEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &AudioDownloadStartedEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        let AudioDownloadStartedEvent { video, .. } = event;

        let title = video
            .metadata
            .title
            .as_deref()
            .map_or_else(|| NULL.clone(), |title| title.white().bold());

        let audio_progress_bar = self.progress_bars.add(self.audio_progress_bar.clone());
        audio_progress_bar.println(format!("Downloading audio: {}", title));

        Ok(())
    }
}

#[async_trait]
impl Update<AudioDownloadProgressUpdatedEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &AudioDownloadProgressUpdatedEvent) -> Fallible<()> {
        let AudioDownloadProgressUpdatedEvent { downloaded_bytes, total_bytes, elapsed } = event;

        let seconds = elapsed.as_secs_f64();
        let bytes_per_second = if seconds > 0.0 { (*downloaded_bytes as f64 / seconds) as u64 } else { 0 };

        let speed = FormattedBytesPerSecond(bytes_per_second);
        let downloaded = FormattedBytes(*downloaded_bytes);

        match total_bytes {
            Some(total_bytes) if *total_bytes > 0 => {
                let percentage = FormattedPercentage((*downloaded_bytes * 100 / total_bytes).min(100));

                let remaining_bytes = total_bytes.saturating_sub(*downloaded_bytes);
                let eta = match bytes_per_second {
                    0 => format!("{}", FormattedUninitDuration),
                    _ => format!("{}", FormattedDuration(::std::time::Duration::from_secs(remaining_bytes / bytes_per_second))),
                };

                self.audio_progress_bar.set_position(*percentage);
                self.audio_progress_bar
                    .set_prefix(format!("{:<24} {}", format!("{} @ {}", downloaded, speed), eta));
                self.audio_progress_bar.set_message(format!("{}", percentage));
            },

            _ => {
                self.audio_progress_bar
                    .set_prefix(format!("{:<24} {}", format!("{} @ {}", downloaded, speed), FormattedUninitDuration));
                self.audio_progress_bar.tick();
            },
        }

        Ok(())
    }
}

#[async_trait]
impl Update<AudioDownloadCompletedEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, _: &AudioDownloadCompletedEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        static AUDIO_PROGRESS_BAR_FINISH_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
            lazy_progress_style!("{prefix} {bar:50.green} {msg}");

        self.audio_progress_bar.set_style(AUDIO_PROGRESS_BAR_FINISH_STYLE.clone());
        self.audio_progress_bar.set_position(100);
        self.audio_progress_bar
            .set_prefix(self.audio_progress_bar.prefix().green().to_string());
        self.audio_progress_bar
            .set_message(format!("{}", FormattedPercentage(100)).green().to_string());

        self.audio_progress_bar.finish();

        Ok(())
    }
}

#[async_trait]
impl Update<DiagnosticEvent> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, event: &DiagnosticEvent) -> Fallible<()> {
        use ::colored::Colorize as _;

        static DECOY_PROGRESS_BAR_STYLE: ::once_cell::sync::Lazy<::indicatif::ProgressStyle> =
            lazy_progress_style!("{msg}");

        let DiagnosticEvent { message, level } = event;

        let message = match level {
            DiagnosticLevel::Warning => message.yellow(),
        };

        let decoy_progress_bar = self
            .progress_bars
            .insert_before(&self.step_progress_bar, ::indicatif::ProgressBar::no_length().with_style(DECOY_PROGRESS_BAR_STYLE.clone()));

        decoy_progress_bar.finish_with_message(format!("{}", message));

        Ok(())
    }
}

#[async_trait]
impl Update<ConvertVideoResponseModel> for ConvertVideoView {
    async fn update(self: ::std::sync::Arc<Self>, response: &ConvertVideoResponseModel) -> Fallible<()> {
        use ::colored::Colorize as _;

        let ConvertVideoResponseModel { video, source } = response;

        let source = match source {
            AudioSource::Local => "already on disk",
            AudioSource::BackendCache => "from the backend cache",
            AudioSource::Converted => "freshly converted",
        };

        if !self.step_progress_bar.is_finished() {
            self.step_progress_bar.finish_and_clear();
        }

        self.progress_bars.println(format!(
            "Saved {} {}",
            video.path.display().to_string().green().bold(),
            format!("({})", source).color(GRAY)
        ))?;

        Ok(())
    }
}

static NULL: ::once_cell::sync::Lazy<::colored::ColoredString> = lazy_color!("N/A".yellow().bold());

const GRAY: ::colored::Color = ::colored::Color::TrueColor { r: 150, g: 150, b: 150 };

struct FormattedStep(Step);

impl ::std::fmt::Display for FormattedStep {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "[{}/{}]", self.0.ordinal(), Step::ALL.len())
    }
}

struct FormattedPercentage(u64);

impl ::std::ops::Deref for FormattedPercentage {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ::std::fmt::Display for FormattedPercentage {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{:>3}%", self.0)
    }
}

struct FormattedUninitPercentage;

impl ::std::fmt::Display for FormattedUninitPercentage {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{:>3}%", "??")
    }
}

struct FormattedDuration(::std::time::Duration);

impl ::std::fmt::Display for FormattedDuration {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        let seconds = self.0.as_secs();

        let hours = seconds / 3600 % 24;
        let minutes = seconds / 60 % 60;
        let seconds = seconds % 60;

        write!(formatter, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

struct FormattedUninitDuration;

impl ::std::fmt::Display for FormattedUninitDuration {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{:02}:{:02}:{:02}", "??", "??", "??")
    }
}

struct FormattedBytes(u64);

impl ::std::fmt::Display for FormattedBytes {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{}", ::bytesize::ByteSize::b(self.0))
    }
}

struct FormattedUninitBytes;

impl ::std::fmt::Display for FormattedUninitBytes {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "??MiB")
    }
}

struct FormattedBytesPerSecond(u64);

impl ::std::fmt::Display for FormattedBytesPerSecond {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{}/s", FormattedBytes(self.0))
    }
}

struct FormattedUninitBytesPerSecond;

impl ::std::fmt::Display for FormattedUninitBytesPerSecond {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        write!(formatter, "{}/s", FormattedUninitBytes)
    }
}
