use clap::{Args, Parser, Subcommand};
use client::{Connection, Result, StoreOptions};
use log::debug;
use std::process::ExitCode;

/// Run one memcached command and print its result.
#[derive(Parser, Debug)]
#[command(name = "mcrs")]
struct Cli {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(short, long, default_value_t = 11211)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct StoreArgs {
    #[arg(long, default_value_t = 0)]
    flags: u32,

    /// Seconds; up to 30 days is relative, larger is a Unix time.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    exptime: i64,

    /// Do not wait for the server's answer.
    #[arg(long)]
    noreply: bool,
}

impl From<StoreArgs> for StoreOptions {
    fn from(args: StoreArgs) -> Self {
        StoreOptions::default()
            .with_flags(args.flags)
            .with_exptime(args.exptime)
            .with_noreply(args.noreply)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Get {
        key: String,
    },
    Gets {
        key: String,
    },
    /// Fetch several keys at once
    GetMulti {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    Set {
        key: String,
        value: String,
        #[command(flatten)]
        options: StoreArgs,
    },
    Add {
        key: String,
        value: String,
        #[command(flatten)]
        options: StoreArgs,
    },
    Replace {
        key: String,
        value: String,
        #[command(flatten)]
        options: StoreArgs,
    },
    Append {
        key: String,
        value: String,
        #[command(flatten)]
        options: StoreArgs,
    },
    Prepend {
        key: String,
        value: String,
        #[command(flatten)]
        options: StoreArgs,
    },
    Cas {
        key: String,
        unique: u64,
        value: String,
        #[command(flatten)]
        options: StoreArgs,
    },
    Delete {
        key: String,
        #[arg(long)]
        noreply: bool,
    },
    Incr {
        key: String,
        amount: u64,
        #[arg(long)]
        noreply: bool,
    },
    Decr {
        key: String,
        amount: u64,
        #[arg(long)]
        noreply: bool,
    },
    FlushAll {
        #[arg(long, default_value_t = 0)]
        delay: i64,
    },
    Version,
}

fn print_value(key: &str, flags: u32, unique: Option<u64>, data: &[u8]) {
    let data = String::from_utf8_lossy(data);
    match unique {
        Some(unique) => println!("{key} flags={flags} unique={unique} {data}"),
        None => println!("{key} flags={flags} {data}"),
    }
}

async fn run(conn: &mut Connection, command: Command) -> Result<()> {
    match command {
        Command::Get { key } => match conn.get(&key).await? {
            Some(value) => print_value(&key, value.flags, None, &value.data),
            None => println!("NOT_FOUND"),
        },
        Command::Gets { key } => match conn.gets(&key).await? {
            Some(value) => print_value(&key, value.flags, Some(value.unique), &value.data),
            None => println!("NOT_FOUND"),
        },
        Command::GetMulti { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            for (key, value) in conn.get_multi(&keys).await? {
                print_value(&key, value.flags, None, &value.data);
            }
        }
        Command::Set {
            key,
            value,
            options,
        } => println!("{:?}", conn.set(&key, value, &options.into()).await?),
        Command::Add {
            key,
            value,
            options,
        } => println!("{:?}", conn.add(&key, value, &options.into()).await?),
        Command::Replace {
            key,
            value,
            options,
        } => println!("{:?}", conn.replace(&key, value, &options.into()).await?),
        Command::Append {
            key,
            value,
            options,
        } => println!("{:?}", conn.append(&key, value, &options.into()).await?),
        Command::Prepend {
            key,
            value,
            options,
        } => println!("{:?}", conn.prepend(&key, value, &options.into()).await?),
        Command::Cas {
            key,
            unique,
            value,
            options,
        } => println!("{:?}", conn.cas(&key, unique, value, &options.into()).await?),
        Command::Delete { key, noreply } => {
            if conn.delete(&key, noreply).await? {
                println!("DELETED");
            } else {
                println!("NOT_FOUND");
            }
        }
        Command::Incr {
            key,
            amount,
            noreply,
        } => match conn.incr_str(&key, amount, noreply).await? {
            Some(value) => println!("{value}"),
            None if noreply => {}
            None => println!("NOT_FOUND"),
        },
        Command::Decr {
            key,
            amount,
            noreply,
        } => match conn.decr_str(&key, amount, noreply).await? {
            Some(value) => println!("{value}"),
            None if noreply => {}
            None => println!("NOT_FOUND"),
        },
        Command::FlushAll { delay } => {
            conn.flush_all(delay).await?;
            println!("OK");
        }
        Command::Version => println!("{}", conn.version().await?),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let Cli {
        host,
        port,
        command,
    } = Cli::parse();
    debug!("Command: {command:?}");

    let result = async move {
        let mut conn = Connection::open(&host, port).await?;
        run(&mut conn, command).await?;
        conn.close().await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
