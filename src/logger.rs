use env_logger::Builder;
use log::LevelFilter;
use std::{io::Write, str::FromStr};

pub fn start_log(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(buf, "{}: {}: {}", buf.timestamp(), record.level(), record.args())
        })
        .filter_level(level)
        .init();
}
