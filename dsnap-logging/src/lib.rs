use std::{
    env,
    io::{self, Write},
    path::Path,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, registry, EnvFilter};

// --- Custom "Tee" Writer ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Compact,
    Json,
}

/// Logging settings read from `DSNAP_LOG_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
    pub file_path: String,
}

impl LogSettings {
    pub fn from_env(default_level: &str) -> Self {
        Self::from_lookup(default_level, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(default_level: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup("DSNAP_LOG_LEVEL").unwrap_or_else(|| default_level.to_string());
        let output = match lookup("DSNAP_LOG_OUTPUT").as_deref() {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            Some("off") | Some("none") => LogOutput::Off,
            _ => LogOutput::Console,
        };
        let format = match lookup("DSNAP_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Human,
        };
        let file_path =
            lookup("DSNAP_LOG_FILE_PATH").unwrap_or_else(|| "/tmp/dsnap.log".to_string());

        Self {
            level,
            output,
            format,
            file_path,
        }
    }
}

fn install<W>(filter: EnvFilter, format: LogFormat, writer: W) -> bool
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = registry().with(filter);
    let layer = fmt::layer().with_writer(writer).with_target(false);
    match format {
        LogFormat::Json => subscriber.with(layer.json()).try_init().is_ok(),
        LogFormat::Compact => subscriber.with(layer.compact()).try_init().is_ok(),
        LogFormat::Human => subscriber.with(layer).try_init().is_ok(),
    }
}

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` wins over `DSNAP_LOG_LEVEL`, which wins over `default_level`.
/// Console output goes to stderr so stdout stays reserved for dry-run output.
/// The returned guard must be held until exit when file output is enabled.
pub fn init_subscriber(default_level: &str) -> Option<WorkerGuard> {
    let settings = LogSettings::from_env(default_level);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let log_path = Path::new(&settings.file_path);
    let log_dir = log_path.parent().unwrap_or_else(|| Path::new("/tmp"));
    let log_filename = log_path.file_name().unwrap_or("dsnap.log".as_ref());

    match settings.output {
        LogOutput::Both => {
            let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let tee_writer = MakeTee {
                make_a: io::stderr,
                make_b: non_blocking,
            };
            install(env_filter, settings.format, tee_writer);
            Some(guard)
        }
        LogOutput::File => {
            let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            install(env_filter, settings.format, non_blocking);
            Some(guard)
        }
        LogOutput::Console => {
            install(env_filter, settings.format, io::stderr);
            None
        }
        LogOutput::Off => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup("info", |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s.level, "info");
        assert_eq!(s.output, LogOutput::Console);
        assert_eq!(s.format, LogFormat::Human);
        assert_eq!(s.file_path, "/tmp/dsnap.log");
    }

    #[test]
    fn test_env_overrides() {
        let s = settings(&[
            ("DSNAP_LOG_LEVEL", "debug"),
            ("DSNAP_LOG_OUTPUT", "both"),
            ("DSNAP_LOG_FORMAT", "json"),
            ("DSNAP_LOG_FILE_PATH", "/var/log/dsnap/run.log"),
        ]);
        assert_eq!(s.level, "debug");
        assert_eq!(s.output, LogOutput::Both);
        assert_eq!(s.format, LogFormat::Json);
        assert_eq!(s.file_path, "/var/log/dsnap/run.log");
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let s = settings(&[("DSNAP_LOG_OUTPUT", "syslog"), ("DSNAP_LOG_FORMAT", "xml")]);
        assert_eq!(s.output, LogOutput::Console);
        assert_eq!(s.format, LogFormat::Human);
    }

    #[test]
    fn test_tee_writes_to_both() {
        let mut tee = Tee {
            a: Vec::new(),
            b: Vec::new(),
        };
        tee.write_all(b"entry skipped").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.a, b"entry skipped");
        assert_eq!(tee.b, b"entry skipped");
    }
}
