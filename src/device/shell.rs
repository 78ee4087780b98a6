//! ADB-backed realization of the frame source and input injector, driving
//! the `adb` CLI the same way a human would from a shell: `exec-out
//! screencap -p` for frames, `input tap|swipe` for events, `wm size` for
//! geometry.

use super::types::{Frame, FrameSource, InputEvent, InputInjector};
use crate::error::{BotError, BotResult};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub struct AdbShell {
    serial: Option<String>,
    screen_width: u32,
    screen_height: u32,
    capture_timeout: Duration,
    input_timeout: Duration,
}

impl AdbShell {
    /// Connect to a device (first one when `serial` is unset) and read its
    /// screen geometry.
    pub async fn connect(
        serial: Option<String>,
        capture_timeout: Duration,
        input_timeout: Duration,
    ) -> BotResult<Self> {
        Self::ensure_adb_available()?;
        let mut shell = Self {
            serial,
            screen_width: 0,
            screen_height: 0,
            capture_timeout,
            input_timeout,
        };
        let (width, height) = shell.query_screen_size().await?;
        shell.screen_width = width;
        shell.screen_height = height;
        log::info!(
            "📱 connected to {} ({}x{})",
            shell.serial.as_deref().unwrap_or("first device"),
            width,
            height
        );
        Ok(shell)
    }

    fn ensure_adb_available() -> BotResult<()> {
        match std::process::Command::new("adb").arg("version").output() {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(BotError::Device(format!(
                "'adb' found but returned non-zero ({}); check the Android Platform Tools install",
                out.status
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BotError::Device(
                "'adb' binary not found in PATH; install Android Platform Tools".into(),
            )),
            Err(e) => Err(BotError::Device(format!("failed to invoke 'adb': {e}"))),
        }
    }

    fn adb(&self) -> Command {
        let mut cmd = Command::new("adb");
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd
    }

    async fn shell(&self, args: &[&str]) -> BotResult<String> {
        let mut cmd = self.adb();
        cmd.arg("shell").args(args);
        let run = async {
            let out = cmd
                .output()
                .await
                .map_err(|e| BotError::Device(format!("adb shell spawn failed: {e}")))?;
            if !out.status.success() {
                return Err(BotError::Device(format!(
                    "adb shell {:?} failed: {}",
                    args,
                    String::from_utf8_lossy(&out.stderr)
                )));
            }
            Ok(String::from_utf8_lossy(&out.stdout).into_owned())
        };
        timeout(self.input_timeout, run).await.map_err(|_| {
            BotError::Device(format!("adb shell {args:?} timed out"))
        })?
    }

    async fn query_screen_size(&self) -> BotResult<(u32, u32)> {
        let stdout = self.shell(&["wm", "size"]).await?;
        parse_screen_size(&stdout)
            .ok_or_else(|| BotError::Device(format!("could not parse 'wm size' output: {stdout}")))
    }

    /// Whether `package` currently owns a visible window.
    pub async fn is_foreground(&self, package: &str) -> BotResult<bool> {
        let out = self.shell(&["dumpsys", "window", "windows"]).await?;
        Ok(out.contains(package))
    }

    /// Launch an app by package name via the monkey launcher shortcut.
    pub async fn launch_app(&self, package: &str) -> BotResult<()> {
        self.shell(&[
            "monkey",
            "-p",
            package,
            "-c",
            "android.intent.category.LAUNCHER",
            "1",
        ])
        .await?;
        Ok(())
    }

    /// Keep the screen on while connected over USB.
    pub async fn stay_awake(&self, enable: bool) -> BotResult<()> {
        let mode = if enable { "usb" } else { "false" };
        self.shell(&["svc", "power", "stayon", mode]).await?;
        Ok(())
    }

    /// One raw PNG capture, for the `--screenshot` CLI mode.
    pub async fn capture_png(&self) -> BotResult<Vec<u8>> {
        let mut cmd = self.adb();
        cmd.arg("exec-out").arg("screencap").arg("-p");
        let run = async {
            let out = cmd
                .output()
                .await
                .map_err(|e| BotError::Device(format!("screencap spawn failed: {e}")))?;
            if !out.status.success() || out.stdout.is_empty() {
                return Err(BotError::FrameDecode(format!(
                    "screencap returned no data: {}",
                    String::from_utf8_lossy(&out.stderr)
                )));
            }
            Ok(out.stdout)
        };
        timeout(self.capture_timeout, run)
            .await
            .map_err(|_| BotError::CaptureTimeout {
                timeout: self.capture_timeout,
            })?
    }
}

fn parse_screen_size(stdout: &str) -> Option<(u32, u32)> {
    for line in stdout.lines() {
        if let Some(size) = line.strip_prefix("Physical size: ") {
            let mut parts = size.trim().split('x');
            if let (Some(x), Some(y)) = (parts.next(), parts.next())
                && let (Ok(x), Ok(y)) = (x.parse(), y.parse())
            {
                return Some((x, y));
            }
        }
    }
    None
}

impl FrameSource for AdbShell {
    async fn capture(&mut self) -> BotResult<Frame> {
        let png = self.capture_png().await?;
        let gray = image::load_from_memory(&png)
            .map_err(|e| BotError::FrameDecode(e.to_string()))?
            .to_luma8();
        Ok(Frame::new(gray))
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }
}

impl InputInjector for AdbShell {
    async fn send(&mut self, event: &InputEvent) -> BotResult<()> {
        let rejected = |reason: String| BotError::InputInjection {
            event: event.describe(),
            reason,
        };

        match *event {
            InputEvent::Tap { x, y } => {
                if x >= self.screen_width || y >= self.screen_height {
                    return Err(rejected(format!(
                        "coordinates outside {}x{} screen",
                        self.screen_width, self.screen_height
                    )));
                }
                self.shell(&["input", "tap", &x.to_string(), &y.to_string()])
                    .await
                    .map(|_| ())
                    .map_err(|e| rejected(e.to_string()))
            }
            InputEvent::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            } => self
                .shell(&[
                    "input",
                    "swipe",
                    &x1.to_string(),
                    &y1.to_string(),
                    &x2.to_string(),
                    &y2.to_string(),
                    &duration_ms.to_string(),
                ])
                .await
                .map(|_| ())
                .map_err(|e| rejected(e.to_string())),
            // The dispatcher performs the delay; nothing to send.
            InputEvent::Wait { .. } => Ok(()),
        }
    }
}
