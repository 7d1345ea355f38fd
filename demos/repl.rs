//////////////////////////////////////////////////////////////////////////////
//
// Interactive prompt for flying the drone by typing commands
//
//  - any drone command, eg "takeoff", "up 50", "cw 90", "flip l", "land"
//  - a script name ("testflight", "square") to run it
//  - "status" to print the latest state
//  - "stop", "no" or "help" for an emergency stop
//  - "quit" to leave
//
// Set TELLO_HOST to talk to a simulator instead of a real drone.
//
//////////////////////////////////////////////////////////////////////////////

use std::io::Write;
use std::net::{IpAddr, SocketAddr};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tello_session::{scripts, DroneSession, SessionOptions, CONTROL_UDP_PORT, DEFAULT_DRONE_HOST};

const PROMPT: &str = "tello > ";

fn prompt() {
    print!("{PROMPT}");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let host: IpAddr = match std::env::var("TELLO_HOST") {
        Ok(host) => host.parse()?,
        Err(_) => DEFAULT_DRONE_HOST.into(),
    };

    let mut options = SessionOptions::default();
    options.drone_address = SocketAddr::new(host, CONTROL_UDP_PORT);
    options.on_reply(|_| prompt());

    let drone = DroneSession::bind(options).await?;
    drone.initialize().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        match input {
            "" => prompt(),
            "quit" => break,
            "status" => {
                match drone.get_status() {
                    Some(status) => println!("{status}"),
                    None => println!("no status received yet"),
                }
                prompt();
            }
            "help" | "stop" | "no" => drone.emergency_stop().await?,
            name if scripts::names().contains(&name) => drone.run_script(name)?,
            // a failed send ends the program
            command => drone.command(command).await?,
        }
    }

    drone.close();
    println!("Exiting command line");

    Ok(())
}
