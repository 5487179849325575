use clap::Parser;
use mpegts_sections::pipeline::{Options, run};

#[derive(Parser)]
struct Opt {
    /// UDP socket to bind + listen (IPv4)
    #[clap(long, default_value = "239.1.1.2:1234")]
    addr: String,

    /// Refresh interval for the JSON snapshot
    #[clap(long, default_value_t = 2)]
    refresh: u64,

    /// Demux only this PID (decimal or 0x-prefixed hex)
    #[clap(long, value_parser = parse_pid)]
    pid: Option<u16>,
}

fn parse_pid(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    match parsed {
        Ok(pid) if pid <= 0x1FFF => Ok(pid),
        Ok(pid) => Err(format!("PID 0x{pid:X} out of 13-bit range")),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    run(Options {
        addr: opt.addr.parse()?,
        refresh_secs: opt.refresh,
        pid_filter: opt.pid,
    })
    .await
}
