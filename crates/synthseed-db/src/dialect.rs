//! SQL syntax differences between vendors.

use synthseed_core::Vendor;

/// Both PostgreSQL and MySQL cap prepared statements at 65 535 parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Quote an identifier for the given vendor.
pub fn quote_identifier(vendor: Vendor, ident: &str) -> String {
    match vendor {
        Vendor::MySql => format!("`{}`", ident.replace('`', "``")),
        Vendor::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Placeholder for the 1-based parameter `index`.
pub fn placeholder(vendor: Vendor, index: usize) -> String {
    match vendor {
        Vendor::MySql => "?".to_string(),
        Vendor::Postgres => format!("${index}"),
    }
}

/// Upper bound for a single statement payload.
///
/// MySQL's limit is the server's `max_allowed_packet` (4 MiB on older
/// defaults); PostgreSQL has no hard packet limit so a larger budget is used.
pub fn max_payload_bytes(vendor: Vendor) -> usize {
    match vendor {
        Vendor::MySql => 4 * 1024 * 1024,
        Vendor::Postgres => 16 * 1024 * 1024,
    }
}

/// Cast a column to text inside a `SELECT` list.
pub fn cast_to_text(vendor: Vendor, expression: &str) -> String {
    match vendor {
        Vendor::MySql => format!("CAST({expression} AS CHAR)"),
        Vendor::Postgres => format!("({expression})::text"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_per_vendor() {
        assert_eq!(quote_identifier(Vendor::MySql, "order"), "`order`");
        assert_eq!(quote_identifier(Vendor::Postgres, "order"), "\"order\"");
        assert_eq!(quote_identifier(Vendor::Postgres, "we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn placeholders_per_vendor() {
        assert_eq!(placeholder(Vendor::MySql, 3), "?");
        assert_eq!(placeholder(Vendor::Postgres, 3), "$3");
    }
}
