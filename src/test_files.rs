use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

pub struct TestFiles {
    dir: TempDir,
}

impl TestFiles {
    pub fn new() -> Self {
        TestFiles {
            dir: TempDir::new().expect("to be able to create a temp dir"),
        }
    }

    pub fn add_file<Name: ?Sized + AsRef<str>, Contents: AsRef<[u8]>>(
        &mut self,
        name: &Name,
        contents: Contents,
    ) {
        let path = Utf8PathBuf::from(name.as_ref());
        assert!(path.is_relative());

        let path = self.dir.path().join(path);
        std::fs::create_dir_all(path.parent().expect("path to have a parent"))
            .expect("to be able to create any dirs");

        std::fs::write(path, contents).expect("to be able to write a file")
    }

    pub fn with_file<Name: ?Sized + AsRef<str>, Contents: AsRef<str>>(
        mut self,
        name: &Name,
        contents: Contents,
    ) -> Self {
        self.add_file(name, unindent::unindent(contents.as_ref()));
        self
    }

    pub fn with_bytes<Name: ?Sized + AsRef<str>>(mut self, name: &Name, contents: &[u8]) -> Self {
        self.add_file(name, contents);
        self
    }

    pub fn root(&self) -> Utf8PathBuf {
        Utf8Path::from_path(self.dir.path())
            .unwrap()
            .canonicalize_utf8()
            .unwrap()
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.root().join(name)).expect("to be able to read a file")
    }
}
