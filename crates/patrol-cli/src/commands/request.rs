use std::io::{self, Read};

use crate::commands::common::{emit_response, CliDispatcher};
use crate::error::CliError;

pub async fn run_request(dispatcher: &CliDispatcher, body: &str) -> Result<(), CliError> {
    let body = read_request_body(body)?;
    let response = dispatcher.handle_body(body.as_bytes()).await;
    emit_response(&response)
}

/// `-` reads the body from stdin; anything else is the body itself.
pub fn read_request_body(argument: &str) -> Result<String, CliError> {
    let body = if argument.trim() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        argument.to_string()
    };

    if body.trim().is_empty() {
        return Err(CliError::EmptyRequest);
    }
    Ok(body)
}
