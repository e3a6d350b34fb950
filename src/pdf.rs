//! Print-to-PDF.
//!
//! HTML documents are printed by a [`Printer`]. The production implementation,
//! [`ChromePrinter`], serves the output directory over a transient local HTTP
//! server and drives headless Chrome's print-to-PDF:
//!
//! ```text
//! dist/cv.html ──► LocalServer 127.0.0.1:<port> ──► headless Chrome ──► dist/cv.pdf
//! ```
//!
//! Both the server and the browser live only for one [`Printer::print`] call.
//! They are released by `Drop` on every exit path: the server's accept thread is
//! signalled and joined, and dropping `Browser` kills the Chrome process.

use crate::config::PdfConfig;
use crate::render::RenderedDocument;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::fs;
use std::io::{Read as _, Write as _};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Cannot print {0}: not a file inside a directory")]
    InvalidPath(PathBuf),
    #[error("Printer returned something other than a PDF for {0}")]
    NotPdf(PathBuf),
}

fn browser_error(e: impl std::fmt::Display) -> PdfError {
    PdfError::Browser(e.to_string())
}

/// Page geometry and print flags, all lengths in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub paper_width: f64,
    pub paper_height: f64,
    pub print_background: bool,
}

impl From<&PdfConfig> for PdfOptions {
    fn from(config: &PdfConfig) -> Self {
        let (paper_width, paper_height) = config.paper.inches();
        Self {
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
            paper_width,
            paper_height,
            print_background: config.print_background,
        }
    }
}

impl PdfOptions {
    fn to_chrome(self) -> PrintToPdfOptions {
        PrintToPdfOptions {
            landscape: Some(false),
            print_background: Some(self.print_background),
            paper_width: Some(self.paper_width),
            paper_height: Some(self.paper_height),
            margin_top: Some(self.margin_top),
            margin_bottom: Some(self.margin_bottom),
            ..Default::default()
        }
    }
}

/// Prints one HTML file to PDF bytes.
pub trait Printer {
    fn print(&self, html: &Path, options: &PdfOptions) -> Result<Vec<u8>, PdfError>;
}

/// Headless Chrome printer. Launches a fresh browser per document.
#[derive(Debug, Default)]
pub struct ChromePrinter;

impl Printer for ChromePrinter {
    fn print(&self, html: &Path, options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
        let invalid = || PdfError::InvalidPath(html.to_path_buf());
        let root = html.parent().ok_or_else(invalid)?;
        let file_name = html
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(invalid)?;

        let server = LocalServer::start(root.to_path_buf())?;
        let browser = Browser::new(LaunchOptions {
            window_size: Some((1280, 800)),
            ..Default::default()
        })
        .map_err(browser_error)?;

        let tab = browser.new_tab().map_err(browser_error)?;
        tab.navigate_to(&server.url_for(file_name))
            .map_err(browser_error)?
            .wait_until_navigated()
            .map_err(browser_error)?;
        let pdf = tab
            .print_to_pdf(Some(options.to_chrome()))
            .map_err(browser_error)?;
        let _ = tab.close(true);
        Ok(pdf)
    }
}

/// One printed document, reported by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedDocument {
    pub output: String,
    pub pdf_path: PathBuf,
    pub bytes: usize,
}

/// Print every rendered document that wants a PDF, writing `<output>.pdf`
/// next to its HTML file. Stops at the first failure.
pub fn print_documents(
    printer: &dyn Printer,
    documents: &[RenderedDocument],
    options: &PdfOptions,
) -> Result<Vec<PrintedDocument>, PdfError> {
    let mut printed = Vec::new();
    for doc in documents.iter().filter(|d| d.wants_pdf) {
        let pdf = printer.print(&doc.html_path, options)?;
        if !pdf.starts_with(b"%PDF") {
            return Err(PdfError::NotPdf(doc.html_path.clone()));
        }
        let pdf_path = doc.html_path.with_extension("pdf");
        fs::write(&pdf_path, &pdf)?;
        printed.push(PrintedDocument {
            output: doc.output.clone(),
            pdf_path,
            bytes: pdf.len(),
        });
    }
    Ok(printed)
}

// ============================================================================
// Local HTTP server
// ============================================================================

/// Serves files from one directory on an ephemeral localhost port.
///
/// Requests are handled one at a time on a single accept thread. Dropping the
/// server stops and joins that thread.
pub struct LocalServer {
    port: u16,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LocalServer {
    pub fn start(root: PathBuf) -> Result<Self, PdfError> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;
        let (tx, rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if rx.try_recv().is_ok() {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _)) => serve_request(stream, &root),
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            stop: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url(), percent_encode(file_name))
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_request(mut stream: TcpStream, root: &Path) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 4096];
    let n = match stream.read(&mut buf) {
        Ok(n) if n > 0 => n,
        _ => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let target = request.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let rel = percent_decode(path.trim_start_matches('/'));

    let file_path = (!rel.is_empty() && !rel.split('/').any(|part| part == ".."))
        .then(|| root.join(&rel))
        .filter(|p| p.is_file());

    let (status, body, ct) = match file_path.and_then(|p| fs::read(&p).ok().map(|b| (p, b))) {
        Some((p, body)) => ("200 OK", body, content_type(&p)),
        None => ("404 Not Found", b"Not Found".to_vec(), "text/plain"),
    };

    let header = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {ct}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]));
            if let (Some(hi), Some(lo)) = hex {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
