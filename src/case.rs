//! Identifier case conversion: Go-style field names to column names, labels and table names.

/// Initialisms kept together as one token when converting to snake case.
const COMMON_INITIALISMS: &[&str] = &[
    "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID", "IP", "JSON",
    "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SSH", "TLS", "TTL", "UID", "UI", "UUID",
    "URI", "URL", "UTF8", "VM", "XML", "XSRF", "XSS",
];

/// Rewrites every initialism occurrence to title case ("HTTPServer" -> "HttpServer"),
/// scanning left to right and taking the first listed initialism that matches at each position.
fn title_initialisms(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    'outer: while !rest.is_empty() {
        for initialism in COMMON_INITIALISMS {
            if let Some(tail) = rest.strip_prefix(initialism) {
                let mut chars = initialism.chars();
                if let Some(first) = chars.next() {
                    out.push(first);
                    out.extend(chars.map(|c| c.to_ascii_lowercase()));
                }
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Column name for a field name: `EmployeeID` -> `employee_id`,
/// `HTTPServerHandlerForURLID` -> `http_server_handler_for_url_id`.
pub fn to_db_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let value = title_initialisms(name);
    let bytes = value.as_bytes();
    let len = bytes.len();
    let mut buf: Vec<u8> = Vec::with_capacity(len + 4);
    let mut last_upper = false;
    let mut curr_upper = false;

    for i in 0..len - 1 {
        let v = bytes[i];
        let next = bytes[i + 1];
        let next_upper = next.is_ascii_uppercase();
        let next_digit = next.is_ascii_digit();

        if i > 0 {
            if curr_upper {
                if last_upper && (next_upper || next_digit) {
                    buf.push(v);
                } else {
                    if bytes[i - 1] != b'_' && next != b'_' {
                        buf.push(b'_');
                    }
                    buf.push(v);
                }
            } else {
                buf.push(v);
                if i == len - 2 && next_upper && !next_digit {
                    buf.push(b'_');
                }
            }
        } else {
            curr_upper = true;
            buf.push(v);
        }
        last_upper = curr_upper;
        curr_upper = next_upper;
    }
    buf.push(bytes[len - 1]);

    String::from_utf8_lossy(&buf).to_lowercase()
}

/// Human label for an identifier: `CreditCard` -> `Credit Card`, `user_id` -> `User Id`.
pub fn humanize(name: &str) -> String {
    let snake = to_db_name(name);
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plural snake-case name used for tables and route segments: `CreditCard` -> `credit_cards`.
pub fn plural_snake(name: &str) -> String {
    let snake = to_db_name(name);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralizer::pluralize(last, 2, false)),
        None => pluralizer::pluralize(&snake, 2, false),
    }
}
