use std::io::{self, BufRead, Write};

use super::error::unaddressed;
use super::router::handle_request;
use super::types::{AppState, Request};

/// Answers one JSON request per input line until the input closes. Returns
/// how many lines were answered. Write failures end the loop.
pub fn serve<R, W>(input: R, output: &mut W, state: &mut AppState) -> io::Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut answered = 0usize;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<Request>(&line) {
            Ok(req) => handle_request(state, req),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                unaddressed("bad_json", e.to_string())
            }
        };

        serde_json::to_writer(&mut *output, &resp)?;
        output.write_all(b"\n")?;
        output.flush()?;
        answered += 1;
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn run(input: &str) -> (usize, Vec<serde_json::Value>) {
        let mut state = AppState::new(Config::default());
        let mut out: Vec<u8> = Vec::new();
        let answered = serve(input.as_bytes(), &mut out, &mut state).expect("serve");
        let text = String::from_utf8(out).expect("utf8 output");
        let lines = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("response json"))
            .collect();
        (answered, lines)
    }

    #[test]
    fn one_reply_per_request_line_and_blank_lines_skipped() {
        let input = concat!(
            "{\"id\":\"a\",\"method\":\"grades.deriveLetter\",\"params\":{\"marks\":90}}\n",
            "\n",
            "   \n",
            "{\"id\":\"b\",\"method\":\"health\"}\n",
        );
        let (answered, replies) = run(input);
        assert_eq!(answered, 2);
        assert_eq!(replies[0]["id"], "a");
        assert_eq!(replies[0]["ok"], true);
        assert_eq!(replies[0]["result"]["letter"], "A+");
        assert_eq!(replies[1]["id"], "b");
        assert!(replies[1].get("error").is_none());
    }

    #[test]
    fn garbage_line_gets_bad_json_without_id() {
        let (answered, replies) = run("{not json\n{\"id\":\"z\",\"method\":\"nope\"}\n");
        assert_eq!(answered, 2);
        assert!(replies[0].get("id").is_none());
        assert_eq!(replies[0]["ok"], false);
        assert_eq!(replies[0]["error"]["code"], "bad_json");
        assert_eq!(replies[1]["id"], "z");
        assert_eq!(replies[1]["error"]["code"], "not_implemented");
        assert!(replies[1]["error"].get("details").is_none());
    }
}
