use fat12_raw::{Fat12Image, Result};
use std::process::ExitCode;

const USAGE: &str = "usage:
    fat12-raw <image> info
    fat12-raw <image> list
    fat12-raw <image> cat <NAME>
    fat12-raw <image> get <NAME> <HOSTFILE>
    fat12-raw <image> put <NAME> <HOSTFILE> [OUT]
    fat12-raw <image> rm <NAME> [OUT]
    fat12-raw <image> boot on|off [OUT]";

/// Mutating commands carry the path to save to, the input image unless OUT is given.
enum Command {
    Info,
    List,
    Cat { name: String },
    Get { name: String, host: String },
    Put { name: String, host: String, out: String },
    Rm { name: String, out: String },
    Boot { yes: bool, out: String },
}

fn parse_command(image_path: &str, args: &[String]) -> Option<Command> {
    let out = |index: usize| args.get(index).cloned().unwrap_or_else(|| image_path.to_string());
    let command = match args.first()?.as_str() {
        "info" => Command::Info,
        "list" => Command::List,
        "cat" => Command::Cat {
            name: args.get(1)?.clone(),
        },
        "get" => Command::Get {
            name: args.get(1)?.clone(),
            host: args.get(2)?.clone(),
        },
        "put" => Command::Put {
            name: args.get(1)?.clone(),
            host: args.get(2)?.clone(),
            out: out(3),
        },
        "rm" => Command::Rm {
            name: args.get(1)?.clone(),
            out: out(2),
        },
        "boot" => Command::Boot {
            yes: match args.get(1)?.as_str() {
                "on" => true,
                "off" => false,
                _ => return None,
            },
            out: out(2),
        },
        _ => return None,
    };
    Some(command)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((image_path, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };
    let Some(command) = parse_command(image_path, rest) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(image_path, command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(image_path: &str, command: Command) -> Result<bool> {
    let mut image = Fat12Image::load(image_path)?;

    match command {
        Command::Info => {
            println!("{}", image_path);
            println!("{}", image.geometry());
            println!("Bootable: {}", if image.is_bootable() { "yes" } else { "no" });
            println!("Free clusters: {}", image.free_clusters());
        }
        Command::List => {
            for entry in image.list() {
                println!("{}", entry);
            }
        }
        Command::Cat { name } => match image.get_file_content(&name) {
            Some(content) => print!("{}", String::from_utf8_lossy(&content)),
            None => {
                eprintln!("{}: not found", name);
                return Ok(false);
            }
        },
        Command::Get { name, host } => match image.get_file_content(&name) {
            Some(content) => std::fs::write(&host, content)?,
            None => {
                eprintln!("{}: not found", name);
                return Ok(false);
            }
        },
        Command::Put { name, host, out } => {
            let content = std::fs::read(&host)?;
            image.insert_file(&name, &content)?;
            image.save(&out)?;
        }
        Command::Rm { name, out } => {
            if !image.delete_file(&name)? {
                eprintln!("{}: not found", name);
                return Ok(false);
            }
            image.save(&out)?;
        }
        Command::Boot { yes, out } => {
            image.make_bootable(yes);
            image.save(&out)?;
        }
    }
    Ok(true)
}
