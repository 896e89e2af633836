// src/geography/names.rs
// Fixed name tables: US subdivisions and ISO 3166 country codes.

const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"), ("AK", "Alaska"), ("AZ", "Arizona"), ("AR", "Arkansas"),
    ("CA", "California"), ("CO", "Colorado"), ("CT", "Connecticut"), ("DE", "Delaware"),
    ("DC", "District of Columbia"), ("FL", "Florida"), ("GA", "Georgia"), ("HI", "Hawaii"),
    ("ID", "Idaho"), ("IL", "Illinois"), ("IN", "Indiana"), ("IA", "Iowa"),
    ("KS", "Kansas"), ("KY", "Kentucky"), ("LA", "Louisiana"), ("ME", "Maine"),
    ("MD", "Maryland"), ("MA", "Massachusetts"), ("MI", "Michigan"), ("MN", "Minnesota"),
    ("MS", "Mississippi"), ("MO", "Missouri"), ("MT", "Montana"), ("NE", "Nebraska"),
    ("NV", "Nevada"), ("NH", "New Hampshire"), ("NJ", "New Jersey"), ("NM", "New Mexico"),
    ("NY", "New York"), ("NC", "North Carolina"), ("ND", "North Dakota"), ("OH", "Ohio"),
    ("OK", "Oklahoma"), ("OR", "Oregon"), ("PA", "Pennsylvania"), ("RI", "Rhode Island"),
    ("SC", "South Carolina"), ("SD", "South Dakota"), ("TN", "Tennessee"), ("TX", "Texas"),
    ("UT", "Utah"), ("VT", "Vermont"), ("VA", "Virginia"), ("WA", "Washington"),
    ("WV", "West Virginia"), ("WI", "Wisconsin"), ("WY", "Wyoming"),
    ("AS", "American Samoa"), ("GU", "Guam"), ("MP", "Northern Mariana Islands"),
    ("PR", "Puerto Rico"), ("VI", "Virgin Islands"),
];

// (alpha-2, alpha-3, common name)
const COUNTRIES: &[(&str, &str, &str)] = &[
    ("US", "USA", "United States"), ("CA", "CAN", "Canada"), ("MX", "MEX", "Mexico"),
    ("GB", "GBR", "United Kingdom"), ("IE", "IRL", "Ireland"), ("FR", "FRA", "France"),
    ("DE", "DEU", "Germany"), ("IT", "ITA", "Italy"), ("ES", "ESP", "Spain"),
    ("PT", "PRT", "Portugal"), ("NL", "NLD", "Netherlands"), ("BE", "BEL", "Belgium"),
    ("CH", "CHE", "Switzerland"), ("AT", "AUT", "Austria"), ("SE", "SWE", "Sweden"),
    ("NO", "NOR", "Norway"), ("DK", "DNK", "Denmark"), ("FI", "FIN", "Finland"),
    ("PL", "POL", "Poland"), ("CZ", "CZE", "Czechia"), ("CN", "CHN", "China"),
    ("JP", "JPN", "Japan"), ("KR", "KOR", "South Korea"), ("IN", "IND", "India"),
    ("AU", "AUS", "Australia"), ("NZ", "NZL", "New Zealand"), ("BR", "BRA", "Brazil"),
    ("ZA", "ZAF", "South Africa"),
];

/// Normalize a subdivision name to its two-letter postal code.
/// Accepts `"Massachusetts"`, `"ma"`, `"MA"` or `"iso2:US-MA"`; unknown names
/// are returned unchanged.
pub fn to_us_state_abbreviation(name: &str) -> String {
    let n = name.trim();
    let n = n.strip_prefix("iso2:").unwrap_or(n);
    let n = n.strip_prefix("US-").unwrap_or(n);
    for (code, full) in US_STATES {
        if n.eq_ignore_ascii_case(code) || n.eq_ignore_ascii_case(full) {
            return s!(*code);
        }
    }
    name.to_string()
}

/// Normalize a country reference to ISO 3166 alpha-3.
/// Accepts `"iso1:US"`, `"US"`, `"USA"`, or the common name; unknown values
/// are returned unchanged.
pub fn to_iso3166_alpha3(name: &str) -> String {
    let n = name.trim();
    let n = n.strip_prefix("iso1:").unwrap_or(n);
    for (a2, a3, full) in COUNTRIES {
        if n.eq_ignore_ascii_case(a2) || n.eq_ignore_ascii_case(a3) || n.eq_ignore_ascii_case(full) {
            return s!(*a3);
        }
    }
    if n.eq_ignore_ascii_case("united states of america") {
        return s!("USA");
    }
    name.to_string()
}
