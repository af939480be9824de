use chrono::{DateTime, Utc};
use terminal_size::{terminal_size, Height, Width};

use crate::models::{role_badge, status_badge, Role, User};

/// Plain rows of text plus a header, rendered as an ASCII grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    pub fn push(&mut self, row: Vec<String>) { self.rows.push(row); }

    /// Render for a terminal `termw` columns wide. Empty tables render as a
    /// single "(no rows)" line.
    pub fn render(&self, termw: usize, colored: bool) -> String {
        if self.rows.is_empty() {
            return "(no rows)".to_string();
        }
        let mut widths: Vec<usize> = self.columns.iter().map(|c| visible_len(c).min(termw)).collect();
        for r in &self.rows {
            for (i, cell) in r.iter().enumerate().take(widths.len()) {
                let w = visible_len(cell);
                if w > widths[i] {
                    widths[i] = w.min(termw);
                }
            }
        }
        let sep = build_separator(&widths);
        let mut out = Vec::with_capacity(self.rows.len() + 5);
        out.push(fit_line_to_width(&sep, termw));
        out.push(fit_line_to_width(&build_header(&self.columns, &widths, colored), termw));
        out.push(fit_line_to_width(&sep, termw));
        for r in &self.rows {
            out.push(fit_line_to_width(&build_row(r, &widths), termw));
        }
        out.push(fit_line_to_width(&sep, termw));
        out.push(format!("rows: {}", self.rows.len()));
        out.join("\n")
    }
}

pub fn users_table(users: &[User], now: DateTime<Utc>) -> Table {
    let mut t = Table::new(["id", "nombre", "email", "rol", "estado", "ultimo_acceso"]);
    for u in users {
        let mut estado = status_badge(u.activo).text.to_string();
        if u.is_locked_at(now) {
            estado.push_str(" (locked)");
        }
        t.push(vec![
            u.id.to_string(),
            u.nombre.clone(),
            u.email.clone(),
            role_badge(u.rol_id).text.to_string(),
            estado,
            u.ultimo_acceso.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    t
}

pub fn roles_table(roles: &[Role]) -> Table {
    let mut t = Table::new(["id", "nombre", "descripcion"]);
    for r in roles {
        t.push(vec![r.id.to_string(), r.nombre.clone(), r.descripcion.clone().unwrap_or_default()]);
    }
    t
}

pub fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 4 => (w - 4) as usize,
        _ => 80,
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

// Headers are left-aligned and optionally green; padding uses visible width.
fn build_header(cells: &[String], widths: &[usize], colored: bool) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let text = truncate(cells.get(i).map(String::as_str).unwrap_or(""), *w);
        s.push(' ');
        if colored {
            s.push_str(&format!("\x1b[32m{}\x1b[0m", text));
        } else {
            s.push_str(&text);
        }
        s.push_str(&" ".repeat(w.saturating_sub(visible_len(&text))));
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit() || "-+.".contains(c)) && st.chars().any(|c| c.is_ascii_digit())
}

/// Visible characters, skipping ANSI CSI sequences.
fn visible_len(s: &str) -> usize {
    let mut count = 0;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.next() == Some('[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        count += 1;
    }
    count
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw || s.contains('\x1b') {
        return s.to_string();
    }
    let keep = maxw.saturating_sub(3);
    let front = keep / 2;
    let back = keep - front;
    let chars: Vec<char> = s.chars().collect();
    let head: String = chars[..front].iter().collect();
    let tail: String = chars[chars.len() - back..].iter().collect();
    format!("{}...{}", head, tail)
}
