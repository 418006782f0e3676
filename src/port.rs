//! Ports: the three always-open standard streams plus user-opened files.
//! Grounded in the spec's `Port { name, file handle }` cell kind; finalized
//! (closed) either explicitly via `close-port` or by the GC sweep when an
//! unreachable port cell is reclaimed (P8).

use std::fs::File;
use std::io::{self, BufReader, Read, Stdin, Stdout, Write};

/// The concrete handle behind a port cell. `Std*` variants never get
/// closed by the finalizer; they are singletons that live for the process.
pub enum PortHandle {
    Stdin(Stdin),
    Stdout(Stdout),
    Stderr(Stdout), // stderr shares Rust's line-buffered Stdout-style handle via io::stderr() at write time
    Input { name: String, file: Option<BufReader<File>> },
    Output { name: String, file: Option<File> },
}

impl PortHandle {
    pub fn name(&self) -> &str {
        match self {
            PortHandle::Stdin(_) => "STDIN",
            PortHandle::Stdout(_) => "STDOUT",
            PortHandle::Stderr(_) => "STDERR",
            PortHandle::Input { name, .. } => name,
            PortHandle::Output { name, .. } => name,
        }
    }

    pub fn open_input(path: &str) -> io::Result<PortHandle> {
        let file = File::open(path)?;
        Ok(PortHandle::Input {
            name: path.to_string(),
            file: Some(BufReader::new(file)),
        })
    }

    pub fn open_output(path: &str) -> io::Result<PortHandle> {
        let file = File::create(path)?;
        Ok(PortHandle::Output {
            name: path.to_string(),
            file: Some(file),
        })
    }

    pub fn is_open(&self) -> bool {
        match self {
            PortHandle::Input { file, .. } => file.is_some(),
            PortHandle::Output { file, .. } => file.is_some(),
            _ => true,
        }
    }

    /// Close the underlying OS resource, if any. Returns the port's name so
    /// the caller (the GC finalizer, or the `close-port` primitive) can log
    /// which file was closed, matching the spec's sweep-phase reporting.
    pub fn close(&mut self) -> Option<String> {
        match self {
            PortHandle::Input { name, file } if file.is_some() => {
                *file = None;
                Some(name.clone())
            }
            PortHandle::Output { name, file } if file.is_some() => {
                *file = None;
                Some(name.clone())
            }
            _ => None,
        }
    }

    pub fn read_char(&mut self) -> io::Result<Option<char>> {
        let mut buf = [0u8; 1];
        let n = match self {
            PortHandle::Stdin(s) => s.read(&mut buf)?,
            PortHandle::Input { file: Some(f), .. } => f.read(&mut buf)?,
            PortHandle::Input { file: None, .. } => {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "port is closed"))
            }
            _ => return Err(io::Error::new(io::ErrorKind::Unsupported, "not an input port")),
        };
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf[0] as char))
        }
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        match self {
            PortHandle::Stdout(o) => o.write_all(s.as_bytes()),
            PortHandle::Stderr(_) => io::stderr().write_all(s.as_bytes()),
            PortHandle::Output { file: Some(f), .. } => f.write_all(s.as_bytes()),
            PortHandle::Output { file: None, .. } => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "port is closed"))
            }
            _ => Err(io::Error::new(io::ErrorKind::Unsupported, "not an output port")),
        }
    }
}
