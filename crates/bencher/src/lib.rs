/// One request body fed through the pipeline by the benchmarks.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    content_type: &'static str,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, content_type: &'static str, file: TestFile) -> Self {
        Self { name, content_type, file }
    }

    pub fn json(name: &'static str, file: TestFile) -> Self {
        Self::new(name, "application/json", file)
    }

    pub fn csv(name: &'static str, file: TestFile) -> Self {
        Self::new(name, "text/csv", file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}
