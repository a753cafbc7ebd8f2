//! Stream Handles
//!
//! File descriptors as seen by a runner. Handles are cheap to clone so a
//! forked runner (pipeline stage, subshell, background job) can share them;
//! the underlying file or pipe closes when the last clone is dropped.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, PipeReader, PipeWriter, Read, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Where bytes written by a command end up.
#[derive(Debug, Clone)]
pub enum OutputStream {
    /// The host process's stdout
    Stdout,
    /// The host process's stderr
    Stderr,
    Null,
    File(Arc<File>),
    Pipe(Arc<PipeWriter>),
    /// In-memory capture (command substitution, `Shell::exec`)
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl OutputStream {
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (OutputStream::Buffer(buf.clone()), buf)
    }

    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            OutputStream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            OutputStream::Stderr => io::stderr().lock().write_all(bytes),
            OutputStream::Null => Ok(()),
            OutputStream::File(file) => (&**file).write_all(bytes),
            OutputStream::Pipe(pipe) => (&**pipe).write_all(bytes),
            OutputStream::Buffer(buf) => {
                buf.lock()
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "output buffer poisoned"))?
                    .extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    pub fn write_str(&self, text: &str) -> io::Result<()> {
        self.write_all(text.as_bytes())
    }

    /// Hand this stream to a child process. A capture buffer gets an OS
    /// pipe plus a pump thread that must be joined after the child exits.
    pub fn to_stdio(&self) -> io::Result<(Stdio, Option<JoinHandle<()>>)> {
        Ok(match self {
            OutputStream::Stdout => (Stdio::inherit(), None),
            OutputStream::Stderr => (Stdio::from(host_stderr()?), None),
            OutputStream::Null => (Stdio::null(), None),
            OutputStream::File(file) => (Stdio::from(file.try_clone()?), None),
            OutputStream::Pipe(pipe) => (Stdio::from(pipe.try_clone()?), None),
            OutputStream::Buffer(buf) => {
                let (mut reader, writer) = io::pipe()?;
                let buf = buf.clone();
                let pump = std::thread::spawn(move || {
                    let mut chunk = [0u8; 8192];
                    loop {
                        match reader.read(&mut chunk) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if let Ok(mut b) = buf.lock() {
                                    b.extend_from_slice(&chunk[..n]);
                                }
                            }
                        }
                    }
                });
                (Stdio::from(writer), Some(pump))
            }
        })
    }
}

/// Duplicate the host stderr descriptor so a child can use it as any stream.
fn host_stderr() -> io::Result<OwnedFd> {
    io::stderr().as_fd().try_clone_to_owned()
}

/// Where a command reads from.
#[derive(Debug, Clone)]
pub enum InputStream {
    Stdin,
    Null,
    File(Arc<File>),
    Pipe(Arc<PipeReader>),
    /// Here-document or here-string body with a shared read position
    Bytes(Arc<Mutex<Cursor<Vec<u8>>>>),
}

impl InputStream {
    pub fn bytes(data: Vec<u8>) -> Self {
        InputStream::Bytes(Arc::new(Mutex::new(Cursor::new(data))))
    }

    /// Read a single byte. Reading one byte at a time leaves the rest of
    /// the stream for the next command.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = match self {
            InputStream::Stdin => io::stdin().lock().read(&mut byte)?,
            InputStream::Null => 0,
            InputStream::File(file) => (&**file).read(&mut byte)?,
            InputStream::Pipe(pipe) => (&**pipe).read(&mut byte)?,
            InputStream::Bytes(cursor) => cursor
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "input buffer poisoned"))?
                .read(&mut byte)?,
        };
        Ok(if n == 0 { None } else { Some(byte[0]) })
    }

    /// Drain the stream.
    pub fn read_to_end(&self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        match self {
            InputStream::Stdin => {
                io::stdin().lock().read_to_end(&mut data)?;
            }
            InputStream::Null => {}
            InputStream::File(file) => {
                (&**file).read_to_end(&mut data)?;
            }
            InputStream::Pipe(pipe) => {
                (&**pipe).read_to_end(&mut data)?;
            }
            InputStream::Bytes(cursor) => {
                cursor
                    .lock()
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "input buffer poisoned"))?
                    .read_to_end(&mut data)?;
            }
        }
        Ok(data)
    }

    /// Hand this stream to a child process. In-memory bodies are fed
    /// through an OS pipe by a writer thread.
    pub fn to_stdio(&self) -> io::Result<(Stdio, Option<JoinHandle<()>>)> {
        Ok(match self {
            InputStream::Stdin => (Stdio::inherit(), None),
            InputStream::Null => (Stdio::null(), None),
            InputStream::File(file) => (Stdio::from(file.try_clone()?), None),
            InputStream::Pipe(pipe) => (Stdio::from(pipe.try_clone()?), None),
            InputStream::Bytes(_) => {
                let data = self.read_to_end()?;
                let (reader, mut writer) = io::pipe()?;
                let feeder = std::thread::spawn(move || {
                    // A child that exits early closes the pipe; that is fine.
                    let _ = writer.write_all(&data);
                });
                (Stdio::from(reader), Some(feeder))
            }
        })
    }
}

/// One open descriptor.
#[derive(Debug, Clone)]
pub enum Fd {
    Input(InputStream),
    Output(OutputStream),
    /// Opened with `<>`
    ReadWrite(Arc<File>),
}

/// The descriptor table of a runner.
#[derive(Debug, Clone)]
pub struct IoContext {
    fds: BTreeMap<u32, Fd>,
}

impl IoContext {
    pub fn new(stdin: InputStream, stdout: OutputStream, stderr: OutputStream) -> Self {
        let mut fds = BTreeMap::new();
        fds.insert(0, Fd::Input(stdin));
        fds.insert(1, Fd::Output(stdout));
        fds.insert(2, Fd::Output(stderr));
        Self { fds }
    }

    /// The host process's own streams.
    pub fn inherit() -> Self {
        Self::new(InputStream::Stdin, OutputStream::Stdout, OutputStream::Stderr)
    }

    pub fn get(&self, fd: u32) -> Option<&Fd> {
        self.fds.get(&fd)
    }

    pub fn set(&mut self, fd: u32, stream: Fd) {
        self.fds.insert(fd, stream);
    }

    pub fn close(&mut self, fd: u32) {
        self.fds.remove(&fd);
    }

    pub fn input(&self, fd: u32) -> InputStream {
        match self.fds.get(&fd) {
            Some(Fd::Input(stream)) => stream.clone(),
            Some(Fd::ReadWrite(file)) => InputStream::File(file.clone()),
            _ => InputStream::Null,
        }
    }

    pub fn output(&self, fd: u32) -> OutputStream {
        match self.fds.get(&fd) {
            Some(Fd::Output(stream)) => stream.clone(),
            Some(Fd::ReadWrite(file)) => OutputStream::File(file.clone()),
            _ => OutputStream::Null,
        }
    }

    pub fn stdin(&self) -> InputStream {
        self.input(0)
    }

    pub fn stdout(&self) -> OutputStream {
        self.output(1)
    }

    pub fn stderr(&self) -> OutputStream {
        self.output(2)
    }
}
