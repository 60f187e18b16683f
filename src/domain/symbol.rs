//! Exchange and currency lookup from a ticker's market suffix.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMeta {
    pub exchange: &'static str,
    pub currency: &'static str,
}

const SUFFIXES: &[(&str, &str, &str)] = &[
    (".IS", "Borsa Istanbul (Turkey)", "TRY"),
    (".TO", "Toronto (Canada)", "CAD"),
    (".V", "TSX Venture (Canada)", "CAD"),
    (".L", "London (UK)", "GBP"),
    (".DE", "Xetra (Germany)", "EUR"),
    (".PA", "Euronext Paris (France)", "EUR"),
    (".MI", "Borsa Italiana (Italy)", "EUR"),
    (".AS", "Euronext Amsterdam (Netherlands)", "EUR"),
    (".HK", "Hong Kong", "HKD"),
    (".T", "Tokyo (Japan)", "JPY"),
    (".KS", "Korea Exchange", "KRW"),
    (".KQ", "KOSDAQ (Korea)", "KRW"),
    (".AX", "ASX (Australia)", "AUD"),
    (".NZ", "NZX (New Zealand)", "NZD"),
    (".SG", "SGX (Singapore)", "SGD"),
    (".SW", "SIX (Switzerland)", "CHF"),
    (".ZU", "SIX (Switzerland)", "CHF"),
    (".BM", "BME (Spain)", "EUR"),
    (".OL", "Oslo (Norway)", "NOK"),
    (".ST", "Stockholm (Sweden)", "SEK"),
    (".HE", "Helsinki (Finland)", "EUR"),
    (".CO", "Copenhagen (Denmark)", "DKK"),
    (".BK", "SET (Thailand)", "THB"),
    (".JK", "IDX (Indonesia)", "IDR"),
    (".TW", "TWSE (Taiwan)", "TWD"),
    (".TA", "TASE (Israel)", "ILS"),
];

const US_MARKET: SymbolMeta = SymbolMeta {
    exchange: "US (NYSE/Nasdaq)",
    currency: "USD",
};

/// Tickers without a known suffix are treated as US listings.
pub fn symbol_meta(symbol: &str) -> SymbolMeta {
    let upper = symbol.trim().to_uppercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _, _)| upper.ends_with(suffix))
        .map(|&(_, exchange, currency)| SymbolMeta { exchange, currency })
        .unwrap_or(US_MARKET)
}
