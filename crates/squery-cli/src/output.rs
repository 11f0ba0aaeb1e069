//! Argument parsing and terminal output

use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::{Map, Value};
use squery_core::{ArgValue, Event, FieldMap, Request};

/// Build a request from `key=value` and `-flag` words
///
/// A key given several times becomes a `|` separated group, e.g.
/// `clid=1 clid=2` is sent as `clid=1|clid=2`.
pub fn parse_request(command: &str, words: &[String], server_id: u32) -> Result<Request> {
    if command.trim().is_empty() || command.contains(char::is_whitespace) {
        bail!("Invalid command name: {:?}", command);
    }

    let mut args: Vec<(String, Vec<String>)> = Vec::new();
    let mut request = Request::new(command).server(server_id);

    for word in words {
        if let Some(flag) = word.strip_prefix('-') {
            if flag.is_empty() {
                bail!("Empty flag");
            }
            request = request.flag(flag);
            continue;
        }

        let Some((key, value)) = word.split_once('=') else {
            bail!("Expected key=value or -flag, got {:?}", word);
        };
        match args.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => args.push((key.to_string(), vec![value.to_string()])),
        }
    }

    for (key, mut values) in args {
        let value = if values.len() == 1 {
            ArgValue::Scalar(values.remove(0))
        } else {
            ArgValue::List(values)
        };
        request = request.arg(key, value);
    }
    Ok(request)
}

/// JSON array of objects, keys sorted
pub fn objects_to_json(objects: &[FieldMap]) -> Value {
    Value::Array(
        objects
            .iter()
            .map(|object| {
                let mut keys: Vec<&String> = object.keys().collect();
                keys.sort();
                let map: Map<String, Value> = keys
                    .into_iter()
                    .map(|k| (k.clone(), Value::String(object[k].clone())))
                    .collect();
                Value::Object(map)
            })
            .collect(),
    )
}

pub fn print_objects(objects: &[FieldMap], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&objects_to_json(objects))?);
        return Ok(());
    }

    for (i, object) in objects.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let mut keys: Vec<&String> = object.keys().collect();
        keys.sort();
        let width = keys.iter().map(|k| k.len()).max().unwrap_or(0);
        for key in keys {
            println!("{:width$}  {}", key.cyan(), object[key], width = width);
        }
    }
    Ok(())
}

/// One line summary of a notification
pub fn describe(event: &Event) -> String {
    match event {
        Event::ServerEdited(e) => format!("server edited by {}", e.invoker_name),
        Event::ClientEnterView(e) => format!(
            "{} (clid {}) joined channel {}",
            e.nickname, e.client_id, e.to
        ),
        Event::ClientLeftView(e) => match e.reason {
            Some(reason) => format!(
                "clid {} left channel {} ({})",
                e.client_id, e.from, reason
            ),
            None => format!("clid {} left channel {}", e.client_id, e.from),
        },
        Event::ClientMoved(e) => format!("clid {} moved to channel {}", e.client_id, e.to),
        Event::ChannelCreated(e) => format!(
            "channel {} {:?} created by {}",
            e.channel_id, e.name, e.invoker_name
        ),
        Event::ChannelDeleted(e) => {
            format!("channel {} deleted by {}", e.channel_id, e.invoker_name)
        }
        Event::ChannelEdited(e) => {
            format!("channel {} edited by {}", e.channel_id, e.invoker_name)
        }
        Event::ChannelMoved(e) => format!(
            "channel {} moved below {} (order {})",
            e.channel_id, e.parent_id, e.order
        ),
        Event::ChannelDescriptionChanged(e) => {
            format!("channel {} description changed", e.channel_id)
        }
        Event::ChannelPasswordChanged(e) => {
            format!("channel {} password changed", e.channel_id)
        }
        Event::TextMessage(e) => format!("<{}> {}", e.invoker_name, e.message),
        Event::TokenUsed(e) => format!("clid {} used token {}", e.client_id, e.token),
    }
}
