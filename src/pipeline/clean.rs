use std::io::ErrorKind;

use camino::Utf8Path;

/// Deletes an output directory tree. A directory that's already gone is fine.
pub async fn clean_dir(path: &Utf8Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(%path, "Nothing to clean");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use crate::test_files::TestFiles;

    use super::*;

    #[tokio::test]
    async fn test_clean_removes_the_whole_tree() {
        let test_files = TestFiles::new()
            .with_file("dist/css/style.css", "")
            .with_file("dist/index.html", "")
            .with_file("src/index.html", "");

        clean_dir(&test_files.root().join("dist")).await.unwrap();

        assert!(!test_files.root().join("dist").exists());
        assert!(test_files.root().join("src/index.html").exists());
    }

    #[tokio::test]
    async fn test_clean_is_idempotent() {
        let test_files = TestFiles::new();
        let dist = test_files.root().join("dist");

        clean_dir(&dist).await.unwrap();
        clean_dir(&dist).await.unwrap();

        assert!(!dist.exists());
    }
}
