use tinypath_data_model::{Format, ParseError, Span, Value};
use tree_sitter::{Node, Parser};

pub struct Json;

impl Format for Json {
    fn parse(&self, source: &str, filename: &str) -> Result<Value, Vec<ParseError>> {
        let whole_file = || Span {
            filename: filename.to_owned(),
            start: 0,
            end: source.len(),
        };

        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_json::language())
            .map_err(|e| {
                vec![ParseError {
                    message: format!("Failed to load JSON grammar: {e}"),
                    span: whole_file(),
                }]
            })?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            vec![ParseError {
                message: "Failed to parse json".to_owned(),
                span: whole_file(),
            }]
        })?;
        let root_node = tree.root_node();

        let mut errors = Vec::new();
        if root_node.has_error() {
            collect_syntax_errors(&root_node, filename, &mut errors);
            if errors.is_empty() {
                errors.push(ParseError {
                    message: "Failed to parse json".to_owned(),
                    span: whole_file(),
                });
            }
            return Err(errors);
        }

        let result = parse_value(&root_node, source, filename, &mut errors);
        match result {
            Some(value) if errors.is_empty() => Ok(value),
            _ => Err(errors),
        }
    }
}

fn collect_syntax_errors(node: &Node, filename: &str, errors: &mut Vec<ParseError>) {
    if node.is_error() {
        errors.push(ParseError {
            message: "Unexpected input".to_owned(),
            span: make_span(node, filename),
        });
        return;
    }
    if node.is_missing() {
        errors.push(ParseError {
            message: format!("Missing {}", node.kind()),
            span: make_span(node, filename),
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_syntax_errors(&child, filename, errors);
    }
}

fn parse_value(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<Value> {
    match node.kind() {
        "null" => Some(Value::Null),
        "false" | "true" => Some(Value::Bool(node.kind() == "true")),
        "number" => {
            let text = node.utf8_text(source.as_bytes()).ok()?;
            match text.parse::<f64>() {
                Ok(num) => Some(Value::Number(num)),
                Err(e) => {
                    errors.push(ParseError {
                        message: format!("Failed to parse number '{}': {}", text, e),
                        span: make_span(node, filename),
                    });
                    None
                }
            }
        }
        "string" => parse_string_value(node, source, filename, errors).map(Value::String),
        "array" => {
            let mut children = Vec::new();
            let mut cursor = node.walk();

            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                children.push(parse_value(&child, source, filename, errors)?);
            }

            Some(Value::Array(children))
        }
        "object" => {
            let mut pairs = Vec::new();
            let mut cursor = node.walk();

            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "pair" => {
                        let key_node = child
                            .child_by_field_name("key")
                            .or_else(|| child.named_child(0))?;
                        let value_node = child
                            .child_by_field_name("value")
                            .or_else(|| child.named_child(1))?;
                        let key = parse_string_value(&key_node, source, filename, errors)?;
                        let value = parse_value(&value_node, source, filename, errors)?;
                        pairs.push((key, value));
                    }
                    "comment" => (),
                    _ => {
                        errors.push(ParseError {
                            message: format!("Unexpected node type: {}", child.kind()),
                            span: make_span(&child, filename),
                        });
                        return None;
                    }
                }
            }

            Some(Value::Object(pairs))
        }
        "document" => {
            let mut cursor = node.walk();
            let mut values = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment");
            let Some(first) = values.next() else {
                errors.push(ParseError {
                    message: "Expected a JSON value".to_owned(),
                    span: make_span(node, filename),
                });
                return None;
            };
            if let Some(extra) = values.next() {
                errors.push(ParseError {
                    message: "Unexpected second JSON value".to_owned(),
                    span: make_span(&extra, filename),
                });
                return None;
            }
            parse_value(&first, source, filename, errors)
        }
        _ => {
            errors.push(ParseError {
                message: format!("Unexpected node type: {}", node.kind()),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn parse_string_value(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<String> {
    if node.kind() != "string" {
        errors.push(ParseError {
            message: format!("Expected string, got {}", node.kind()),
            span: make_span(node, filename),
        });
        return None;
    }

    let text = node.utf8_text(source.as_bytes()).ok()?;
    // the literal, quotes included, is itself a JSON document
    match serde_json::from_str::<String>(text) {
        Ok(unescaped) => Some(unescaped),
        Err(e) => {
            errors.push(ParseError {
                message: format!("Invalid string literal: {e}"),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn make_span(node: &Node, filename: &str) -> Span {
    Span {
        filename: filename.to_string(),
        start: node.start_byte(),
        end: node.end_byte(),
    }
}
