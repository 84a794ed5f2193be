//! The line-oriented state machine

use crate::syntax::{END_STATE, EOF_STATE, LineOp, RecordOp, START_STATE, Template, ValueDef};
use crate::{Record, TemplateError};
use tracing::trace;

/// Current value of one column while parsing
#[derive(Debug, Clone, Default)]
struct Slot {
    value: Option<String>,
    items: Vec<String>,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.value.is_none() && self.items.is_empty()
    }

    fn render(&self, def: &ValueDef) -> String {
        if def.options.list {
            if self.items.is_empty() {
                String::new()
            } else {
                format!("[{}]", self.items.join(", "))
            }
        } else {
            self.value.clone().unwrap_or_default()
        }
    }

    fn reset(&mut self) {
        self.value = None;
        self.items.clear();
    }
}

struct Machine<'t> {
    template: &'t Template,
    slots: Vec<Slot>,
    rows: Vec<Vec<String>>,
}

impl<'t> Machine<'t> {
    fn new(template: &'t Template) -> Self {
        Self {
            template,
            slots: vec![Slot::default(); template.values.len()],
            rows: Vec::new(),
        }
    }

    fn assign(&mut self, index: usize, value: &str) {
        let def = &self.template.values[index];
        if def.options.list {
            self.slots[index].items.push(value.to_string());
        } else {
            self.slots[index].value = Some(value.to_string());
        }

        if def.options.fillup {
            for row in self.rows.iter_mut().rev() {
                if !row[index].is_empty() {
                    break;
                }
                row[index] = value.to_string();
            }
        }
    }

    /// Drop everything except Filldown values
    fn clear(&mut self) {
        for (slot, def) in self.slots.iter_mut().zip(&self.template.values) {
            if !def.options.filldown {
                slot.reset();
            }
        }
    }

    fn clear_all(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    fn record(&mut self) {
        let values = &self.template.values;

        let missing_required = values
            .iter()
            .zip(&self.slots)
            .any(|(def, slot)| def.options.required && slot.is_empty());
        if missing_required {
            self.clear();
            return;
        }

        // A record carrying only Filldown values is not a new entity
        let has_data = values
            .iter()
            .zip(&self.slots)
            .any(|(def, slot)| !def.options.filldown && !slot.is_empty());
        if !has_data {
            return;
        }

        let row = values
            .iter()
            .zip(&self.slots)
            .map(|(def, slot)| slot.render(def))
            .collect();
        self.rows.push(row);
        self.clear();
    }

    fn run(mut self, text: &str) -> Result<Vec<Vec<String>>, TemplateError> {
        let template = self.template;
        let mut state = START_STATE;

        'lines: for (line_no, line) in text.lines().enumerate() {
            let Some(rules) = template.states.get(state) else {
                break;
            };

            for rule in rules {
                let Some(caps) = rule.regex.captures(line) else {
                    continue;
                };

                for &index in &rule.captures {
                    let name = &template.values[index].name;
                    if let Some(m) = caps.name(name) {
                        self.assign(index, m.as_str());
                    }
                }

                if rule.line_op == LineOp::Error {
                    return Err(TemplateError::Action {
                        line: line_no + 1,
                        message: rule
                            .error_message
                            .clone()
                            .unwrap_or_else(|| format!("rule matched '{line}'")),
                    });
                }

                match rule.record_op {
                    RecordOp::NoRecord => {}
                    RecordOp::Record => self.record(),
                    RecordOp::Clear => self.clear(),
                    RecordOp::Clearall => self.clear_all(),
                }

                if let Some(next) = &rule.new_state {
                    trace!(from = state, to = %next, line = line_no + 1, "State transition");
                    state = next.as_str();
                    if state == END_STATE || state == EOF_STATE {
                        break 'lines;
                    }
                }

                if rule.line_op == LineOp::Next {
                    break;
                }
            }
        }

        if state != END_STATE && !template.has_eof_state() {
            self.record();
        }

        Ok(self.rows)
    }
}

impl Template {
    /// Parse raw text into value rows (no header)
    pub fn parse_text(&self, text: &str) -> Result<Vec<Vec<String>>, TemplateError> {
        Machine::new(self).run(text)
    }

    /// Parse raw text into rows, optionally preceded by the header row
    ///
    /// The header is emitted even when no data rows matched.
    pub fn parse_rows(&self, text: &str, add_header: bool) -> Result<Vec<Vec<String>>, TemplateError> {
        let rows = self.parse_text(text)?;
        if !add_header {
            return Ok(rows);
        }
        let mut out = Vec::with_capacity(rows.len() + 1);
        out.push(self.header());
        out.extend(rows);
        Ok(out)
    }

    /// Parse raw text into records keyed by column name
    pub fn parse_records(&self, text: &str) -> Result<Vec<Record>, TemplateError> {
        let header = self.header();
        Ok(self
            .parse_text(text)?
            .into_iter()
            .map(|row| Record::from_pairs(header.iter().cloned().zip(row)))
            .collect())
    }
}
