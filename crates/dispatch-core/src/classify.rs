use crate::models::{Category, Task, TaskPayload};

pub const DEFAULT_THESIS_TITLE: &str = "Sin titulo";
pub const THESIS_SEPARATOR: char = ';';

const PREFIXES: &[(&str, Category)] = &[
    ("integral:", Category::Integral),
    ("derivada:", Category::Derivative),
    ("derivative:", Category::Derivative),
    ("tesis:", Category::Thesis),
    ("thesis:", Category::Thesis),
];

/// Maps one raw task line to a typed task. Never fails: lines without a known
/// prefix become [`Category::Unrecognized`] and are reported by the runner.
pub fn classify(raw: &str) -> Task {
    let trimmed = raw.trim();

    for (prefix, category) in PREFIXES {
        let Some(remainder) = strip_prefix_ignore_case(trimmed, prefix) else {
            continue;
        };
        let remainder = remainder.trim();
        let payload = match category {
            Category::Thesis => thesis_payload(remainder),
            _ => TaskPayload::Expression {
                expression: remainder.to_string(),
            },
        };
        return Task {
            raw: raw.to_string(),
            category: *category,
            payload,
        };
    }

    Task {
        raw: raw.to_string(),
        category: Category::Unrecognized,
        payload: TaskPayload::Unrecognized {
            text: trimmed.to_string(),
        },
    }
}

pub fn word_count(body: &str) -> u64 {
    body.split_whitespace().count() as u64
}

fn thesis_payload(remainder: &str) -> TaskPayload {
    match remainder.split_once(THESIS_SEPARATOR) {
        Some((title, body)) => TaskPayload::Thesis {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
        },
        None => TaskPayload::Thesis {
            title: DEFAULT_THESIS_TITLE.to_string(),
            body: remainder.to_string(),
        },
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_THESIS_TITLE, classify, word_count};
    use crate::models::{Category, TaskPayload};

    #[test]
    fn integral_prefix_strips_to_expression() {
        let task = classify("  integral: x**2 ");
        assert_eq!(task.category, Category::Integral);
        assert_eq!(task.expression(), Some("x**2"));
        assert_eq!(task.raw, "  integral: x**2 ");
    }

    #[test]
    fn derivative_accepts_both_spellings_and_any_case() {
        assert_eq!(classify("derivada: sin(x)").category, Category::Derivative);
        assert_eq!(classify("Derivative: cos(x)").category, Category::Derivative);
        assert_eq!(classify("DERIVADA:x").expression(), Some("x"));
    }

    #[test]
    fn thesis_with_separator_splits_title_and_body() {
        let task = classify("tesis: T1; hola mundo prueba");
        assert_eq!(task.category, Category::Thesis);
        assert_eq!(
            task.payload,
            TaskPayload::Thesis {
                title: "T1".to_string(),
                body: "hola mundo prueba".to_string(),
            }
        );
    }

    #[test]
    fn thesis_without_separator_uses_default_title() {
        let task = classify("thesis: only a body here");
        assert_eq!(
            task.payload,
            TaskPayload::Thesis {
                title: DEFAULT_THESIS_TITLE.to_string(),
                body: "only a body here".to_string(),
            }
        );
    }

    #[test]
    fn thesis_splits_on_first_separator_only() {
        let task = classify("tesis: A; b; c");
        assert_eq!(
            task.payload,
            TaskPayload::Thesis {
                title: "A".to_string(),
                body: "b; c".to_string(),
            }
        );
    }

    #[test]
    fn unknown_prefix_is_unrecognized_with_trimmed_text() {
        let task = classify("  limite: x -> 0 ");
        assert_eq!(task.category, Category::Unrecognized);
        assert_eq!(
            task.payload,
            TaskPayload::Unrecognized {
                text: "limite: x -> 0".to_string(),
            }
        );
    }

    #[test]
    fn prefix_must_lead_the_line() {
        assert_eq!(classify("x integral: x").category, Category::Unrecognized);
        assert_eq!(classify("integral").category, Category::Unrecognized);
    }

    #[test]
    fn multibyte_text_shorter_than_prefix_is_unrecognized() {
        assert_eq!(classify("ñ").category, Category::Unrecognized);
        assert_eq!(classify("tesís: x").category, Category::Unrecognized);
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(word_count("hola mundo prueba"), 3);
        assert_eq!(word_count("  uno\tdos\n tres  cuatro "), 4);
        assert_eq!(word_count(""), 0);
    }
}
