//! Output sinks for retrieved key material

use crate::params::OutputParameters;
use crate::protocol::OutputFormat;
use crate::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for plaintext key material
pub trait OutputSink {
    fn emit(&mut self, format: OutputFormat, material: &[u8]) -> Result<()>;
}

/// Render `material` in `format` into `writer`
pub fn write_encoded<W: Write>(writer: &mut W, format: OutputFormat, material: &[u8]) -> io::Result<()> {
    match format {
        OutputFormat::Binary => writer.write_all(material)?,
        OutputFormat::Hex => writeln!(writer, "{}", hex::encode(material))?,
        OutputFormat::Base64 => writeln!(writer, "{}", STANDARD.encode(material))?,
    }
    writer.flush()
}

/// Standard output or a file that is only created when something is emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    pub fn from_parameters(output: &OutputParameters) -> Self {
        match output.path() {
            Some(path) => Self::File(path),
            None => Self::Stdout,
        }
    }
}

impl OutputSink for OutputDestination {
    fn emit(&mut self, format: OutputFormat, material: &[u8]) -> Result<()> {
        match self {
            Self::Stdout => {
                let stdout = io::stdout();
                write_encoded(&mut stdout.lock(), format, material)?;
            }
            Self::File(path) => {
                let mut file = create_private_file(path)?;
                write_encoded(&mut file, format, material)?;
                info!("Key material written to {}", path.display());
            }
        }
        Ok(())
    }
}

/// Create or truncate `path`, readable by the owner only on unix
fn create_private_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Adapter for any `io::Write`
#[derive(Debug, Default)]
pub struct WriterSink<W>(pub W);

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(&mut self, format: OutputFormat, material: &[u8]) -> Result<()> {
        write_encoded(&mut self.0, format, material)?;
        Ok(())
    }
}
