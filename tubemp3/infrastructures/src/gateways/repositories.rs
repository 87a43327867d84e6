use ::async_trait::async_trait;
use ::domain::VideoId;
use ::use_cases::gateways::AudioRepository;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;

pub const DEFAULT_DIRECTORY: &str = "mp3";

/// Keeps converted audio as `<directory>/<video id>.mp3`.
#[derive(::bon::Builder)]
pub struct FilesystemAudioRepository {
    #[builder(into, default = MaybeOwnedPath::Borrowed(::std::path::Path::new(DEFAULT_DIRECTORY)))]
    directory: MaybeOwnedPath,
}

impl FilesystemAudioRepository {
    fn path(&self, id: &VideoId) -> ::std::path::PathBuf {
        self.directory.join(format!("{}.mp3", id))
    }
}

#[async_trait]
impl AudioRepository for FilesystemAudioRepository {
    async fn find(self: ::std::sync::Arc<Self>, id: &VideoId) -> Fallible<Option<MaybeOwnedPath>> {
        let path = self.path(id);

        match ::tokio::fs::metadata(&path).await {
            // Empty files count as missing.
            Ok(metadata) if metadata.is_file() && metadata.len() > 0 => {
                ::tracing::debug!(path = %path.display(), "audio already on disk");
                Ok(Some(path.into()))
            },
            Ok(_) => Ok(None),

            Err(err) if err.kind() == ::std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn locate(self: ::std::sync::Arc<Self>, id: &VideoId) -> Fallible<MaybeOwnedPath> {
        ::tokio::fs::create_dir_all(&self.directory).await?;

        Ok(self.path(id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(directory: &::std::path::Path) -> ::std::sync::Arc<FilesystemAudioRepository> {
        ::std::sync::Arc::new(
            FilesystemAudioRepository::builder()
                .directory(directory.to_path_buf())
                .build(),
        )
    }

    #[tokio::test]
    async fn finds_only_non_empty_files() {
        let directory = ::tempfile::tempdir().unwrap();
        let repository = repository(directory.path());

        let id = VideoId::from("yPvoKz6tyJs");
        assert!(::std::sync::Arc::clone(&repository).find(&id).await.unwrap().is_none());

        ::std::fs::write(directory.path().join("yPvoKz6tyJs.mp3"), b"").unwrap();
        assert!(::std::sync::Arc::clone(&repository).find(&id).await.unwrap().is_none());

        ::std::fs::write(directory.path().join("yPvoKz6tyJs.mp3"), b"ID3").unwrap();
        let found = ::std::sync::Arc::clone(&repository).find(&id).await.unwrap();
        assert_eq!(found.as_deref(), Some(directory.path().join("yPvoKz6tyJs.mp3").as_path()));
    }

    #[tokio::test]
    async fn locate_creates_missing_directory() {
        let directory = ::tempfile::tempdir().unwrap();
        let nested = directory.path().join("music").join("mp3");
        let repository = repository(&nested);

        let path = repository.locate(&VideoId::from("3rLN_-VNcfs")).await.unwrap();

        assert!(nested.is_dir());
        assert_eq!(&*path, nested.join("3rLN_-VNcfs.mp3").as_path());
    }

    #[test]
    fn defaults_to_mp3_directory() {
        let repository = FilesystemAudioRepository::builder().build();

        assert_eq!(repository.path(&VideoId::from("yPvoKz6tyJs")), ::std::path::Path::new("mp3/yPvoKz6tyJs.mp3"));
    }
}
