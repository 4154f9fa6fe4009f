//! Host print subsystem access
//!
//! - CUPS on unix (`lpstat` / `lp -o raw`)
//! - Win32 spooler on Windows (`EnumPrinters` / `WritePrinter` RAW)

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

/// The host's print subsystem
#[async_trait]
pub trait Spooler: Send + Sync {
    /// Whether a printer with this name is installed
    async fn exists(&self, name: &str) -> PrintResult<bool>;

    /// Port identifier behind a printer, `None` if the printer is unknown
    async fn port_of(&self, name: &str) -> PrintResult<Option<String>>;

    /// Submit a staged file as a raw (pass-through) job
    async fn submit_raw(&self, name: &str, file: &Path) -> PrintResult<()>;
}

/// Spooler for the current platform
pub fn default_spooler() -> Arc<dyn Spooler> {
    #[cfg(windows)]
    {
        Arc::new(WindowsSpooler)
    }
    #[cfg(not(windows))]
    {
        Arc::new(CupsSpooler::default())
    }
}

// ============================================================================
// CUPS
// ============================================================================

/// CUPS command-line client
#[cfg(not(windows))]
#[derive(Debug, Clone)]
pub struct CupsSpooler {
    lpstat: String,
    lp: String,
}

#[cfg(not(windows))]
impl Default for CupsSpooler {
    fn default() -> Self {
        Self {
            lpstat: "lpstat".to_string(),
            lp: "lp".to_string(),
        }
    }
}

#[cfg(not(windows))]
impl CupsSpooler {
    /// Use custom `lpstat` / `lp` binaries
    pub fn with_commands(lpstat: impl Into<String>, lp: impl Into<String>) -> Self {
        Self {
            lpstat: lpstat.into(),
            lp: lp.into(),
        }
    }

    async fn run(&self, program: &str, args: &[&OsStr]) -> PrintResult<std::process::Output> {
        tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PrintError::Spooler(format!("{} failed to start: {}", program, e)))
    }
}

#[cfg(not(windows))]
#[async_trait]
impl Spooler for CupsSpooler {
    #[tracing::instrument(skip(self))]
    async fn exists(&self, name: &str) -> PrintResult<bool> {
        let output = self.run(&self.lpstat, &[OsStr::new("-p"), OsStr::new(name)]).await?;
        Ok(output.status.success())
    }

    #[tracing::instrument(skip(self))]
    async fn port_of(&self, name: &str) -> PrintResult<Option<String>> {
        let output = self.run(&self.lpstat, &[OsStr::new("-v"), OsStr::new(name)]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_device_uri(&stdout, name))
    }

    #[tracing::instrument(skip(self))]
    async fn submit_raw(&self, name: &str, file: &Path) -> PrintResult<()> {
        let output = self
            .run(
                &self.lp,
                &[
                    OsStr::new("-d"),
                    OsStr::new(name),
                    OsStr::new("-o"),
                    OsStr::new("raw"),
                    file.as_os_str(),
                ],
            )
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PrintError::Spooler(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

/// Extract the device URI from `lpstat -v` output
///
/// Lines look like `device for TM-T20: usb://EPSON/TM-T20?serial=X`.
pub fn parse_device_uri(stdout: &str, name: &str) -> Option<String> {
    let prefix = format!("device for {}:", name);
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(&prefix))
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
}

// ============================================================================
// Windows
// ============================================================================

/// Win32 print spooler
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsSpooler;

#[cfg(windows)]
impl WindowsSpooler {
    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// List installed printers
    pub fn list() -> PrintResult<Vec<String>> {
        use windows::Win32::Graphics::Printing::{
            EnumPrintersW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_INFO_5W,
        };

        unsafe {
            let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
            let mut needed: u32 = 0;
            let mut returned: u32 = 0;

            let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);

            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                5,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|_| PrintError::Win32("EnumPrintersW failed".to_string()))?;

            let ptr = buf.as_ptr() as *const PRINTER_INFO_5W;
            let slice = std::slice::from_raw_parts(ptr, returned as usize);

            Ok(slice
                .iter()
                .filter(|info| !info.pPrinterName.is_null())
                .map(|info| info.pPrinterName.to_string().unwrap_or_default())
                .collect())
        }
    }

    /// Read the port name from PRINTER_INFO_5
    fn port_name(name: &str) -> PrintResult<Option<String>> {
        use windows::Win32::Graphics::Printing::{
            ClosePrinter, GetPrinterW, OpenPrinterW, PRINTER_HANDLE, PRINTER_INFO_5W,
        };
        use windows::core::PCWSTR;

        unsafe {
            let mut handle: PRINTER_HANDLE = PRINTER_HANDLE::default();
            let name_w = Self::to_wide(name);

            if OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None).is_err() {
                return Ok(None);
            }

            let mut needed: u32 = 0;
            let _ = GetPrinterW(handle, 5, None, &mut needed);

            let mut port = None;
            if needed > 0 {
                let mut buf: Vec<u8> = vec![0; needed as usize];
                if GetPrinterW(handle, 5, Some(buf.as_mut_slice()), &mut needed).is_ok() {
                    let info = &*(buf.as_ptr() as *const PRINTER_INFO_5W);
                    if !info.pPortName.is_null() {
                        port = info.pPortName.to_string().ok();
                    }
                }
            }

            let _ = ClosePrinter(handle);
            Ok(port)
        }
    }

    fn write_raw(name: &str, data: &[u8]) -> PrintResult<()> {
        use core::ffi::c_void;
        use windows::Win32::Graphics::Printing::{
            ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, OpenPrinterW, PRINTER_HANDLE,
            StartDocPrinterW, StartPagePrinter, WritePrinter,
        };
        use windows::core::{PCWSTR, PWSTR};

        unsafe {
            let mut handle: PRINTER_HANDLE = PRINTER_HANDLE::default();
            let name_w = Self::to_wide(name);

            OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None)
                .map_err(|_| PrintError::Win32("OpenPrinterW failed".to_string()))?;

            let doc_name_w = Self::to_wide("Comanda");
            let datatype_w = Self::to_wide("RAW");
            let doc_info = DOC_INFO_1W {
                pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
                pOutputFile: PWSTR::null(),
                pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
            };

            if StartDocPrinterW(handle, 1, &doc_info as *const DOC_INFO_1W) == 0 {
                let _ = ClosePrinter(handle);
                return Err(PrintError::Win32(
                    "StartDocPrinter failed".to_string(),
                ));
            }

            if !StartPagePrinter(handle).as_bool() {
                let _ = EndDocPrinter(handle);
                let _ = ClosePrinter(handle);
                return Err(PrintError::Win32(
                    "StartPagePrinter failed".to_string(),
                ));
            }

            let mut written: u32 = 0;
            let ok = WritePrinter(
                handle,
                data.as_ptr() as *const c_void,
                data.len() as u32,
                &mut written,
            );

            let _ = EndPagePrinter(handle);
            let _ = EndDocPrinter(handle);
            let _ = ClosePrinter(handle);

            if !ok.as_bool() {
                return Err(PrintError::Win32("WritePrinter failed".to_string()));
            }

            if written != data.len() as u32 {
                return Err(PrintError::Win32("Incomplete write".to_string()));
            }

            Ok(())
        }
    }
}

#[cfg(windows)]
#[async_trait]
impl Spooler for WindowsSpooler {
    async fn exists(&self, name: &str) -> PrintResult<bool> {
        let name = name.to_string();
        tokio::task::spawn_blocking(move || Ok(Self::list()?.iter().any(|p| *p == name)))
            .await
            .map_err(|e| PrintError::Win32(format!("Task join failed: {}", e)))?
    }

    async fn port_of(&self, name: &str) -> PrintResult<Option<String>> {
        let name = name.to_string();
        tokio::task::spawn_blocking(move || Self::port_name(&name))
            .await
            .map_err(|e| PrintError::Win32(format!("Task join failed: {}", e)))?
    }

    async fn submit_raw(&self, name: &str, file: &Path) -> PrintResult<()> {
        // WritePrinter needs the bytes in memory
        let data = tokio::fs::read(file).await?;
        let name = name.to_string();
        tokio::task::spawn_blocking(move || Self::write_raw(&name, &data))
            .await
            .map_err(|e| PrintError::Win32(format!("Task join failed: {}", e)))?
    }
}
