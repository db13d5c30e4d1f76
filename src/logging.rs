use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Target};

use crate::db::TIMESTAMP_FORMAT;

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "app.log";

/// `<data_dir>/logs/app.log`
pub fn log_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_DIR).join(LOG_FILE)
}

/// Appends every formatted line to the log file, echoing it to stderr when
/// `echo` is set.
struct LogSink {
    file: File,
    echo: bool,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.echo {
            // A closed stderr must not stop the file log.
            let _ = io::stderr().write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.echo {
            let _ = io::stderr().flush();
        }
        Ok(())
    }
}

/// Logger writing `timestamp - LEVEL - message` lines to the log file under
/// `data_dir`. `RUST_LOG` controls verbosity; the default is `info`.
pub fn builder(data_dir: &Path, echo_stderr: bool) -> io::Result<Builder> {
    let path = log_file_path(data_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format(TIMESTAMP_FORMAT),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(LogSink {
            file,
            echo: echo_stderr,
        })));
    Ok(builder)
}

/// Install the global logger: file log plus stderr.
pub fn init(data_dir: &Path) -> io::Result<()> {
    builder(data_dir, true)?.init();
    Ok(())
}
