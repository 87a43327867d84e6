pub(crate) mod utils;

use ::domain::Bitrate;
use ::infrastructures::boundaries::ConvertVideoView;
use ::infrastructures::gateways::downloaders::HttpAudioDownloader;
use ::infrastructures::gateways::repositories::FilesystemAudioRepository;
use ::infrastructures::gateways::repositories::DEFAULT_DIRECTORY;
use ::infrastructures::gateways::services::Cnvmp3Client;
use ::infrastructures::gateways::services::DEFAULT_BASE_URL;
use ::use_cases::boundaries::Accept;
use ::use_cases::boundaries::ConvertVideoOutputBoundary;
use ::use_cases::boundaries::ConvertVideoRequestModel;
use ::use_cases::gateways::AudioDownloader;
use ::use_cases::gateways::AudioRepository;
use ::use_cases::gateways::ConversionService;
use ::use_cases::interactors::ConvertVideoInteractor;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::extensions::OptionExt;

#[tokio::main]
async fn main() -> ::std::process::ExitCode {
    use ::colored::Colorize as _;

    let writer = ::tracing_appender::rolling::daily("logs", "tubemp3.log");
    let (writer, _guard) = ::tracing_appender::non_blocking(writer);

    ::tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            ::tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| ::tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();

    match run(command().get_matches()).await {
        Ok(()) => ::std::process::ExitCode::SUCCESS,
        Err(err) => {
            ::tracing::error!(error = %format!("{:#}", err), "conversion failed");
            eprintln!("{} {:#}", "error:".red().bold(), err);

            ::std::process::ExitCode::FAILURE
        },
    }
}

fn command() -> ::clap::Command {
    ::clap::Command::new("tubemp3")
        .about("Convert YouTube videos to MP3 through cnvmp3.com")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            ::clap::Command::new("download")
                .about("Convert one video and save its audio")
                .arg(
                    ::clap::Arg::new("url")
                        .short('i')
                        .long("url")
                        .required(true)
                        .value_parser(::clap::value_parser!(::std::string::String)),
                )
                .arg(
                    ::clap::Arg::new("bitrate")
                        .short('b')
                        .long("bitrate")
                        .help("Audio bitrate in kb/s: 320, 256, 128 or 96")
                        .default_value("128")
                        .value_parser(parse_bitrate),
                )
                .arg(
                    ::clap::Arg::new("force")
                        .long("force")
                        .help("Convert again even if the audio is already on disk")
                        .action(::clap::ArgAction::SetTrue),
                ),
        )
        .arg(
            ::clap::Arg::new("directory")
                .short('o')
                .long("directory")
                .global(true)
                .default_value(DEFAULT_DIRECTORY)
                .value_parser(::clap::value_parser!(::std::path::PathBuf)),
        )
        .arg(
            ::clap::Arg::new("base-url")
                .long("base-url")
                .env("TUBEMP3_BASE_URL")
                .global(true)
                .default_value(DEFAULT_BASE_URL)
                .value_parser(::clap::value_parser!(::std::string::String)),
        )
        .arg(
            ::clap::Arg::new("connect-timeout")
                .long("connect-timeout")
                .help("Seconds to wait for a connection to the backend or the CDN")
                .global(true)
                .default_value("30")
                .value_parser(::clap::value_parser!(u64)),
        )
}

fn parse_bitrate(value: &str) -> Fallible<Bitrate> {
    Ok(Bitrate::from_kbps(value.parse()?)?)
}

async fn run(matches: ::clap::ArgMatches) -> Fallible<()> {
    let Some(("download", matches)) = matches.subcommand() else {
        unreachable!()
    };

    let directory: MaybeOwnedPath = matches.get_one::<::std::path::PathBuf>("directory").ok()?.to_owned().into();
    let base_url = matches.get_one::<::std::string::String>("base-url").ok()?.to_owned();
    let connect_timeout = matches
        .get_one::<u64>("connect-timeout")
        .map(|seconds| ::std::time::Duration::from_secs(*seconds))
        .ok()?;

    let http = ::reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("tubemp3/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let view = ::std::sync::Arc::new(ConvertVideoView::new()?);

    let service = ::std::sync::Arc::new(Cnvmp3Client::builder().http(http.clone()).base_url(base_url).build());
    let downloader = ::std::sync::Arc::new(HttpAudioDownloader::builder().http(http).build());
    let repository = ::std::sync::Arc::new(FilesystemAudioRepository::builder().directory(directory).build());

    let convert_video_interactor = ::std::sync::Arc::new(
        ConvertVideoInteractor::builder()
            .output_boundary(::std::sync::Arc::clone(&view) as ::std::sync::Arc<dyn ConvertVideoOutputBoundary>)
            .service(::std::sync::Arc::clone(&service) as ::std::sync::Arc<dyn ConversionService>)
            .downloader(::std::sync::Arc::clone(&downloader) as ::std::sync::Arc<dyn AudioDownloader>)
            .repository(::std::sync::Arc::clone(&repository) as ::std::sync::Arc<dyn AudioRepository>)
            .build(),
    );

    let request = ConvertVideoRequestModel::builder()
        .url(matches.get_one::<::std::string::String>("url").ok()?.to_owned())
        .bitrate(*matches.get_one::<Bitrate>("bitrate").ok()?)
        .force(matches.get_flag("force"))
        .build();

    let response = convert_video_interactor.accept(request).await?;

    ::tracing::info!(path = %response.video.path.display(), source = ?response.source, "conversion finished");

    Ok(())
}
