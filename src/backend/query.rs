//! Declarative table queries rendered as PostgREST query-string parameters.
//!
//! Only the operators the handlers need are modelled: `eq` filters, `or`
//! groups scoped to an embedded resource and ascending order.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: String,
    select: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
}

impl TableQuery {
    #[must_use]
    pub fn new(table: &str, select: &str) -> Self {
        Self {
            table: table.to_string(),
            // PostgREST ignores whitespace only in some positions, so strip it all.
            select: select.split_whitespace().collect(),
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    /// `column = value`. The column may be qualified with an embedded
    /// resource (`country_translations.language_code`), in which case only the
    /// embedded rows are filtered.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Logical OR over `conditions` (each `column.op.value`) applied to the
    /// rows of the embedded resource `embed`.
    #[must_use]
    pub fn or(mut self, embed: &str, conditions: &[&str]) -> Self {
        self.filters
            .push((format!("{embed}.or"), format!("({})", conditions.join(","))));
        self
    }

    /// Sort ascending by `column`; repeated calls add tie-breakers.
    #[must_use]
    pub fn order(mut self, column: &str) -> Self {
        self.order.push(column.to_string());
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Query-string pairs in the order they were added, `select` first.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        pairs.push(("select".to_string(), self.select.clone()));
        pairs.extend(self.filters.iter().cloned());

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|column| format!("{column}.asc"))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn select_only() {
        let query = TableQuery::new("countries", "id, code");
        assert_eq!(query.table(), "countries");
        assert_eq!(query.to_pairs(), vec![pair("select", "id,code")]);
    }

    #[test]
    fn select_strips_embedded_whitespace() {
        let query = TableQuery::new(
            "countries",
            "id,
             code,
             country_translations(
               translated_name
             )",
        );
        assert_eq!(
            query.to_pairs(),
            vec![pair("select", "id,code,country_translations(translated_name)")]
        );
    }

    #[test]
    fn filters_and_order() {
        let query = TableQuery::new("administrative_units", "id,name")
            .eq("country_id", "7")
            .eq("unit_type", "PROVINCE")
            .order("name");

        assert_eq!(
            query.to_pairs(),
            vec![
                pair("select", "id,name"),
                pair("country_id", "eq.7"),
                pair("unit_type", "eq.PROVINCE"),
                pair("order", "name.asc"),
            ]
        );
    }

    #[test]
    fn multiple_order_columns_are_joined() {
        let query = TableQuery::new("countries", "id")
            .order("code")
            .order("id");
        assert_eq!(query.to_pairs()[1], pair("order", "code.asc,id.asc"));
    }

    #[test]
    fn or_group_scoped_to_embed() {
        let query = TableQuery::new("countries", "id").or(
            "country_translations",
            &["language_code.eq.es", "language_code.is.null"],
        );
        assert_eq!(
            query.to_pairs()[1],
            pair(
                "country_translations.or",
                "(language_code.eq.es,language_code.is.null)"
            )
        );
    }
}
