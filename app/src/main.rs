//! sw-connectivity: check that DNS resolvers are reachable through a
//! transport, printing one JSON record per resolver and protocol.
//! 退出码：至少一个测试成功为 0，否则为 1。

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use sw_app::cli::{Args, Proto, DNS_PORT};
use sw_app::report::Record;
use sw_app::tracing_init::init_tracing_once;
use sw_connectivity::{test_resolver_packet_connectivity, test_resolver_stream_connectivity};
use sw_transport::{join_host_port, PacketEndpoint, StreamEndpoint};
use tokio::time::Duration;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing_once(args.verbose);

    let protos = args.protos()?;
    let timeout = Duration::from_millis(args.timeout_ms);

    let mut success = false;
    for host in args.resolver_hosts() {
        let resolver = join_host_port(&host, DNS_PORT);
        for &proto in &protos {
            let started = Utc::now();
            let (duration, result) = match proto {
                Proto::Tcp => {
                    let dialer = sw_config::new_stream_dialer(&args.transport)
                        .context("failed to create stream dialer")?;
                    let endpoint = StreamEndpoint::new(dialer, host.clone(), DNS_PORT);
                    test_resolver_stream_connectivity(&endpoint, &args.domain, timeout).await
                }
                Proto::Udp => {
                    let dialer = sw_config::new_packet_dialer(&args.transport)
                        .context("failed to create packet dialer")?;
                    let endpoint = PacketEndpoint::new(dialer, host.clone(), DNS_PORT);
                    test_resolver_packet_connectivity(&endpoint, &args.domain, timeout).await
                }
            };
            match &result {
                Ok(()) => success = true,
                Err(e) => debug!(%resolver, %proto, error = %e, "test error"),
            }

            let record = Record::new(resolver.clone(), proto, started, duration, &result);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            record.write_line(&mut out)?;
            out.flush().context("failed to output JSON")?;
        }
    }

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
