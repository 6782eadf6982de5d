// Quick and simple JSON-RPC client implementation over a raw TCP
// stream, one request and one response per line.

use std::{
    fs,
    io::{self, BufRead, BufReader, Write},
    net::TcpStream,
    path::Path,
};

use serde::Deserialize;
use serde_json::json;

use basalt_config::config::Config;
use basalt_data_structures::transaction::Transaction;

/// Generic response which is used to extract the result
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: T,
}

/// A failed request returns an error with code and message
#[derive(Debug, Deserialize)]
struct JsonRpcErrorResponse {
    error: ServerError,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: i32,
    message: String,
}

fn start_client(config: &Config) -> Result<TcpStream, anyhow::Error> {
    let addr = config.jsonrpc.server_address;
    log::debug!("Connecting to JSON-RPC server at {}", addr);

    TcpStream::connect(addr)
        .map_err(|e| anyhow::anyhow!("could not connect to the node at {}: {}", addr, e))
}

fn send_request(stream: &mut TcpStream, request: &str) -> Result<String, io::Error> {
    stream.write_all(request.as_bytes())?;
    // Write missing newline, if needed
    if !request.ends_with('\n') {
        stream.write_all(b"\n")?;
    }

    let mut response = String::new();
    let mut reader = BufReader::new(stream);
    reader.read_line(&mut response)?;

    Ok(response)
}

fn parse_response(response: &str) -> Result<serde_json::Value, anyhow::Error> {
    match serde_json::from_str::<JsonRpcResponse<serde_json::Value>>(response) {
        Ok(ok) => Ok(ok.result),
        Err(_) => {
            let error: JsonRpcErrorResponse = serde_json::from_str(response)
                .map_err(|e| anyhow::anyhow!("invalid JSON-RPC response: {}", e))?;

            Err(anyhow::anyhow!(
                "node returned error {}: {}",
                error.error.code,
                error.error.message
            ))
        }
    }
}

/// Print the node status counters
pub fn stats(config: &Config) -> Result<(), anyhow::Error> {
    let mut stream = start_client(config)?;
    let response = send_request(
        &mut stream,
        r#"{"jsonrpc": "2.0", "method": "nodeStats", "id": 1}"#,
    )?;
    let result = parse_response(&response)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Print the unconfirmed transaction pool
pub fn mempool(config: &Config) -> Result<(), anyhow::Error> {
    let mut stream = start_client(config)?;
    let response = send_request(
        &mut stream,
        r#"{"jsonrpc": "2.0", "method": "getMempool", "id": 1}"#,
    )?;
    let result = parse_response(&response)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Submit a transaction set read from a JSON file
pub fn submit(config: &Config, file: &Path) -> Result<(), anyhow::Error> {
    let contents = fs::read_to_string(file)?;
    // Check the file parses as a transaction list before shipping it
    let transactions: Vec<Transaction> = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("{} is not a transaction set: {}", file.display(), e))?;

    let request = json!({
        "jsonrpc": "2.0",
        "method": "submitTransactionSet",
        "params": [transactions],
        "id": 1,
    });

    let mut stream = start_client(config)?;
    let response = send_request(&mut stream, &request.to_string())?;
    let result = parse_response(&response)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Forward JSON-RPC requests from stdin, one per line
pub fn raw(config: &Config) -> Result<(), anyhow::Error> {
    let mut stream = start_client(config)?;
    // The request is read from stdin, one line at a time
    let mut request = String::new();
    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    loop {
        request.clear();
        let count = stdin.read_line(&mut request)?;
        if count == 0 {
            break Ok(());
        }
        let response = send_request(&mut stream, &request)?;
        // The response includes a newline, so use print instead of println
        print!("{}", response);
    }
}
