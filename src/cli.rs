use std::io::{self, Write};
use std::net::TcpStream;

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;

use reverie::analysis::Analysis;
use reverie::model::{Record, RecordId, RecordTag};
use reverie::parser::{self, Command};
use reverie::protocol::*;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Interactive client for a reverie node", long_about = None)]
struct Args {
    #[clap(long, env = "REVERIE_ADDR", default_value = "127.0.0.1:9000")]
    addr: String,
}

fn main() {
    let args = Args::parse();
    print_banner();

    match TcpStream::connect(&args.addr) {
        Ok(_) => println!("[\u{2713}] Connected to reverie at {}!", args.addr),
        Err(_) => {
            println!("[\u{2717}] Could not connect to server at {}.", args.addr);
            println!("    Start a node first: 'cargo run --bin reverie'.");
            return;
        }
    }
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("reverie> ");
        let _ = io::stdout().flush();
        buffer.clear();

        match stdin.read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if buffer.trim().is_empty() { continue; }

        match parser::parse_command(&buffer) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = execute_command(&args.addr, cmd) {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if buffer.contains('\'') {
                    println!("    \u{2139}\u{fe0f}  Hint: Strings use double quotes: THINK \"text\" IN \"category\" AS \"me\"");
                }
            }
        }
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   Reverie CLI - Thoughts & Dreams Ledger");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. THINK:    THINK \"content\" IN \"category\" AS \"author\"");
    println!("2. DREAM:    DREAM \"content\" THEMES [\"a\", \"b\"] AS \"dreamer\"");
    println!("3. GET:      GET THOUGHT 0 | GET DREAM 0");
    println!("4. LIST:     THOUGHTS BY \"author\" | THOUGHTS IN \"category\" | DREAMS BY \"dreamer\"");
    println!("5. DELETE:   DELETE THOUGHT 0 AS \"owner\"");
    println!("6. ANALYZE:  ANALYZE THOUGHTS | ANALYZE DREAMS");
    println!("7. EXIT:     Quit\n");
}

fn execute_command(addr: &str, cmd: Command) -> Result<(), String> {
    match cmd {
        Command::Help => { print_help(); Ok(()) },
        Command::Think { content, category, author } => {
            let resp: Submitted = call(addr, OP_SUBMIT_THOUGHT, &SubmitThought { author, content, category })?;
            println!("[\u{2713} OK] Thought ID: {}", resp.id);
            Ok(())
        },
        Command::Dream { content, themes, dreamer } => {
            let resp: Submitted = call(addr, OP_SUBMIT_DREAM, &SubmitDream { dreamer, content, themes })?;
            println!("[\u{2713} OK] Dream ID: {}", resp.id);
            Ok(())
        },
        Command::GetThought { id } => {
            let record: Option<Record> = call(addr, OP_GET_THOUGHT, &ById { id })?;
            print_record("Thought", id, record);
            Ok(())
        },
        Command::GetDream { id } => {
            let record: Option<Record> = call(addr, OP_GET_DREAM, &ById { id })?;
            print_record("Dream", id, record);
            Ok(())
        },
        Command::ThoughtsBy { author } => list(addr, OP_USER_THOUGHTS, author, "Thoughts by"),
        Command::ThoughtsIn { category } => list(addr, OP_CATEGORY_THOUGHTS, category, "Thoughts in"),
        Command::DreamsBy { dreamer } => list(addr, OP_USER_DREAMS, dreamer, "Dreams by"),
        Command::Delete { id, caller } => {
            let _: () = call(addr, OP_DELETE_THOUGHT, &DeleteThought { caller, id })?;
            println!("[\u{2713} OK] Deleted thought {}", id);
            Ok(())
        },
        Command::AnalyzeThoughts => analyze(addr, OP_ANALYZE_THOUGHTS),
        Command::AnalyzeDreams => analyze(addr, OP_ANALYZE_DREAMS),
        Command::Exit => Ok(()),
    }
}

// --- NETWORK HANDLERS ---

/// One request per connection, like every other command.
fn call<Req: Serialize + ?Sized, Resp: DeserializeOwned>(addr: &str, op: u8, req: &Req) -> Result<Resp, String> {
    let body = serde_json::to_vec(req).map_err(|e| e.to_string())?;
    exchange(addr, op, &body)
}

fn exchange<Resp: DeserializeOwned>(addr: &str, op: u8, body: &[u8]) -> Result<Resp, String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| e.to_string())?;
    write_frame(&mut stream, op, body, MAX_FRAME).map_err(|e| e.to_string())?;

    let (status, resp) = read_frame(&mut stream, MAX_RESPONSE).map_err(|e| e.to_string())?;
    if status == STATUS_OK {
        serde_json::from_slice(&resp).map_err(|e| format!("Malformed response: {}", e))
    } else {
        match serde_json::from_slice::<ErrorBody>(&resp) {
            Ok(err) => Err(format!("{} ({})", err.message, err.code)),
            Err(_) => Err("Server Rejected Request".into()),
        }
    }
}

fn list(addr: &str, op: u8, key: String, label: &str) -> Result<(), String> {
    let ids: Vec<RecordId> = call(addr, op, &ByKey { key: key.clone() })?;
    if ids.is_empty() {
        println!("{} \"{}\": none", label, key);
    } else {
        let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        println!("{} \"{}\": [{}]", label, key, joined.join(", "));
    }
    Ok(())
}

fn analyze(addr: &str, op: u8) -> Result<(), String> {
    let analysis: Analysis = exchange(addr, op, &[])?;
    println!("\nCommon words: {}", analysis.common_words.join(", "));
    println!("Sentiment:    {:+.3}\n", analysis.sentiment);
    Ok(())
}

fn print_record(kind: &str, id: RecordId, record: Option<Record>) {
    let record = match record {
        Some(r) => r,
        None => {
            println!("[\u{2717}] {} {} Not Found.", kind, id);
            return;
        }
    };

    println!("{} #{} by {} at {}", kind, record.id, record.author, record.timestamp);
    println!("  \"{}\"", record.content);
    match record.tag {
        RecordTag::Thought { category } => println!("  category: {}", category),
        RecordTag::Dream { themes } => println!("  themes:   [{}]", themes.join(", ")),
    }
}
