//! Single host block rendering.
//!
//! ```text
//! define host {
//! \thost_name\t\tweb-01
//! \taddress\t\t\t10.0.0.1
//! }
//!
//! ```
//!
//! Each line is a tab, the field name, two tabs, then padding tabs so values
//! land on the same tab stop: `longest / 4 - len / 4` tabs, where `longest` is
//! the longest field name in that record.

use fleetwatch_core::{HostRecord, Schema};

const TAB_WIDTH: usize = 4;

/// Render one record, fields in schema order.
pub fn render_host(schema: &Schema, record: &HostRecord) -> String {
    let fields: Vec<(&str, &str)> = schema
        .fields()
        .iter()
        .filter_map(|f| record.get(f).map(|v| (f.as_str(), v)))
        .collect();
    let longest = fields.iter().map(|(f, _)| f.len()).max().unwrap_or(0);

    let mut out = String::from("define host {\n");
    for (field, value) in fields {
        let pad = "\t".repeat(longest / TAB_WIDTH - field.len() / TAB_WIDTH);
        out.push_str(&format!("\t{field}\t\t{pad}{value}\n"));
    }
    out.push_str("}\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(
            "host_name",
            vec!["host_name".into(), "alias".into(), "address".into()],
        )
        .unwrap()
    }

    #[test]
    fn renders_fields_in_schema_order_with_tab_padding() {
        let record: HostRecord = [
            ("address", "10.0.0.1"),
            ("alias", "web"),
            ("host_name", "web-01"),
        ]
        .into_iter()
        .collect();

        let expected = "define host {\n\
                        \thost_name\t\tweb-01\n\
                        \talias\t\t\tweb\n\
                        \taddress\t\t\t10.0.0.1\n\
                        }\n\n";
        assert_eq!(render_host(&schema(), &record), expected);
    }

    #[test]
    fn fields_absent_from_record_are_skipped() {
        let record: HostRecord = [("host_name", "web-01")].into_iter().collect();
        assert_eq!(
            render_host(&schema(), &record),
            "define host {\n\thost_name\t\tweb-01\n}\n\n"
        );
    }
}
