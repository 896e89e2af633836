// src/macros.rs
#[macro_export]
macro_rules! s {
    // String shorthand!

    // Zero-arg → String::new()
    () => {
        ::std::string::String::new()
    };
    // Any single expression: literals, consts, or vars
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

#[macro_export]
macro_rules! join {
    // String-type concatenation shorthand!
    ($first:expr $(, $rest:expr)+ $(,)?) => {{
        let mut s = ::std::string::String::from($first);
        $(
            s.push_str($rest);
        )+
        s
    }};
}

/// Record shorthand for sources and tests:
/// `record!{ county: "Essex County", cases: 12.0 }`.
///
/// Known fields are set directly; anything else lands in the extension map.
#[macro_export]
macro_rules! record {
    () => {
        $crate::record::Record::default()
    };
    ($($field:ident : $value:expr),+ $(,)?) => {{
        let mut r = $crate::record::Record::default();
        $(
            $crate::record::Record::set_field(&mut r, stringify!($field), $value);
        )+
        r
    }};
}
