use std::collections::BTreeMap;

/// One rendered output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Forward-slash logical path relative to the project root
    pub path: String,
    pub content: String,
    /// Module instance that rendered the file
    pub module_id: String,
    pub provider: String,
    /// `<type>/<provider>/<source>` of the template it came from
    pub template: String,
}

/// The complete output of a run, keyed and ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, GeneratedFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `file`, returning the file previously stored at the same path.
    pub fn insert(&mut self, file: GeneratedFile) -> Option<GeneratedFile> {
        self.files.insert(file.path.clone(), file)
    }

    pub fn get(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.get(path)
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|f| f.content.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl IntoIterator for FileSet {
    type Item = GeneratedFile;
    type IntoIter = std::collections::btree_map::IntoValues<String, GeneratedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_values()
    }
}
