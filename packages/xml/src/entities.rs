//! XML entity encoding and decoding.

/// Decode the five predefined entities plus numeric character references.
///
/// Returns the offending reference text on failure.
pub fn decode(input: &str) -> Result<String, String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            return Err(tail.to_string());
        };
        let entity = &tail[..=semi];
        let body = &tail[1..semi];

        match body {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code_point = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).map_err(|_| entity.to_string())?
                } else if let Some(dec) = body.strip_prefix('#') {
                    dec.parse::<u32>().map_err(|_| entity.to_string())?
                } else {
                    return Err(entity.to_string());
                };
                out.push(char::from_u32(code_point).ok_or_else(|| entity.to_string())?);
            }
        }

        rest = &tail[semi + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Encode text content: `&`, `<` and `>` only.
pub fn encode_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Encode an attribute value: text encoding plus double quotes.
pub fn encode_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
