use serde_json::Value;

use super::models::Book;

pub const BOOK_TABLE: &str = "book";
const BOOK_COLUMNS: &str = "\"id\", \"name\", \"owner\"";

/// Owner predicate of a book query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerFilter {
    /// `owner = $1`
    Is(String),
    /// `owner IS NULL`
    Unowned,
}

/// Rendered SQL with positional parameters, bound separately from the text
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// Row filter over the book table, built fresh for every call from an
/// already resolved owner value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    owner: OwnerFilter,
}

impl BookQuery {
    /// Books owned by `owner`. An absent owner matches only books that have
    /// no owner; it is never a wildcard.
    pub fn owned_by(owner: Option<String>) -> Self {
        let owner = match owner {
            Some(name) => OwnerFilter::Is(name),
            None => OwnerFilter::Unowned,
        };
        Self { owner }
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = match &self.owner {
            OwnerFilter::Is(name) => ("\"owner\" = $1".to_string(), vec![Value::String(name.clone())]),
            OwnerFilter::Unowned => ("\"owner\" IS NULL".to_string(), vec![]),
        };

        SqlResult {
            query: format!(
                "SELECT {} FROM \"{}\" WHERE {} ORDER BY \"id\" ASC",
                BOOK_COLUMNS, BOOK_TABLE, where_clause
            ),
            params,
        }
    }

    /// In-process evaluation of the same predicate `to_sql` renders
    pub fn matches(&self, book: &Book) -> bool {
        match &self.owner {
            OwnerFilter::Is(name) => book.owner.as_deref() == Some(name.as_str()),
            OwnerFilter::Unowned => book.owner.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book(owner: Option<&str>) -> Book {
        Book {
            id: 1,
            name: Some("Dune".into()),
            owner: owner.map(str::to_string),
        }
    }

    #[test]
    fn owner_is_bound_not_spliced() {
        let sql = BookQuery::owned_by(Some("x' OR '1'='1".into())).to_sql();
        assert_eq!(
            sql.query,
            "SELECT \"id\", \"name\", \"owner\" FROM \"book\" WHERE \"owner\" = $1 ORDER BY \"id\" ASC"
        );
        assert_eq!(sql.params, vec![json!("x' OR '1'='1")]);
    }

    #[test]
    fn absent_owner_renders_is_null() {
        let sql = BookQuery::owned_by(None).to_sql();
        assert!(sql.query.contains("WHERE \"owner\" IS NULL"));
        assert!(sql.params.is_empty());
    }

    #[test]
    fn matches_follows_owner_filter() {
        let isabelle = BookQuery::owned_by(Some("isabelle".into()));
        assert!(isabelle.matches(&book(Some("isabelle"))));
        assert!(!isabelle.matches(&book(Some("bjorn"))));
        assert!(!isabelle.matches(&book(None)));

        let unowned = BookQuery::owned_by(None);
        assert!(unowned.matches(&book(None)));
        assert!(!unowned.matches(&book(Some("isabelle"))));
    }
}
