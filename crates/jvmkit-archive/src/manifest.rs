//! Jar manifest rendering.

/// Fixed manifest location; reserved before any input entry is merged so no
/// input can overwrite it.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Manifest metadata written as the first entry of every built archive.
#[derive(Debug, Clone)]
pub struct ManifestSpec {
    pub version: &'static str,
    pub created_by: String,
    pub main_class: Option<String>,
}

impl ManifestSpec {
    pub fn new(main_class: Option<&str>) -> Self {
        Self {
            version: "1.0",
            created_by: format!("jvmkit {}", env!("CARGO_PKG_VERSION")),
            main_class: main_class.map(str::to_string),
        }
    }

    /// Manifest body, CRLF line endings with the customary trailing blank
    /// line.
    pub fn render(&self) -> String {
        let mut body = String::new();
        body.push_str(&format!("Manifest-Version: {}\r\n", self.version));
        body.push_str(&format!("Created-By: {}\r\n", self.created_by));
        if let Some(main_class) = &self.main_class {
            body.push_str(&format!("Main-Class: {}\r\n", main_class));
        }
        body.push_str("\r\n");
        body
    }
}
