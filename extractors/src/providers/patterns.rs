use regex::Regex;
use std::sync::OnceLock;

use super::Provider;

/// Money fragment shared by every amount pattern.
///
/// Either a currency symbol followed by a number, or a bare number with cents.
/// An optional ISO code may follow.
const MONEY: &str = concat!(
    r"(?:(?P<symbol>US\$|AU\$|A\$|CA\$|C\$|NZ\$|\$|€|£)\s?",
    r"(?P<value>\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d{1,7}(?:\.\d{1,2})?)",
    r"|(?P<bare>\d{1,3}(?:,\d{3})+\.\d{2}|\d{1,7}\.\d{2}))",
    r"(?:\s?(?P<code>USD|EUR|GBP|AUD|CAD|NZD)\b)?",
);

/// Pattern table for one provider
pub struct ProviderPatterns {
    pub provider: Provider,
    pub detect: Regex,
    /// Amount in provider-specific phrasing, tried in order
    pub amount: Vec<Regex>,
    /// Extra ways the provider says autopay is on
    pub autopay_on: Vec<Regex>,
}

fn money_pattern(template: &str) -> Regex {
    Regex::new(&template.replace("{MONEY}", MONEY)).expect("invalid amount regex")
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("invalid provider regex")
}

fn create_provider_patterns() -> Vec<ProviderPatterns> {
    vec![
        ProviderPatterns {
            provider: Provider::Klarna,
            detect: pattern(r"(?i)\bklarna\b"),
            amount: vec![
                money_pattern(r"(?i)\b(?:payment|installment|instalment)\s+of\s+{MONEY}"),
                money_pattern(r"(?i){MONEY}\s+(?:will\s+be\s+)?(?:due|collected|charged)\b"),
            ],
            autopay_on: vec![pattern(
                r"(?i)\bwe(?:'ll|\s+will)\s+(?:automatically\s+)?collect\s+(?:the\s+)?payment\b",
            )],
        },
        ProviderPatterns {
            provider: Provider::Affirm,
            detect: pattern(r"(?i)\baffirm\b"),
            amount: vec![
                money_pattern(r"(?i)\b(?:payment|amount\s+due)\s+(?:of\s+)?{MONEY}\s+(?:is\s+)?due\b"),
                money_pattern(r"(?i)\b(?:monthly\s+)?payment\s+of\s+{MONEY}"),
            ],
            autopay_on: vec![pattern(r"(?i)\bautopay\s+will\s+(?:pay|charge)\b")],
        },
        ProviderPatterns {
            provider: Provider::Afterpay,
            detect: pattern(r"(?i)\bafter\s?pay\b"),
            amount: vec![
                money_pattern(r"(?i)\b(?:installment|instalment|payment)\s+of\s+{MONEY}"),
                money_pattern(r"(?i){MONEY}\s+(?:installment|instalment|payment)\s+(?:is\s+)?due\b"),
            ],
            autopay_on: vec![pattern(
                r"(?i)\bwe(?:'ll|\s+will)\s+(?:automatically\s+)?deduct\b",
            )],
        },
        ProviderPatterns {
            provider: Provider::PayPal,
            detect: pattern(r"(?i)\bpay\s?pal\b"),
            amount: vec![
                money_pattern(r"(?i)\bpayment\s+of\s+{MONEY}"),
                money_pattern(r"(?i)\b(?:amount|payment)\s+due\s*:?\s*{MONEY}"),
            ],
            autopay_on: vec![pattern(
                r"(?i)\bwe(?:'ll|\s+will)\s+(?:automatically\s+)?(?:take|withdraw)\s+(?:the\s+)?payment\b",
            )],
        },
        ProviderPatterns {
            provider: Provider::Zip,
            detect: pattern(concat!(
                r"(?i)\b(?:zip\s?pay|zip\.co|quadpay)\b",
                r"|\bzip\s+(?:payment|installment|instalment|plan|order|app|account|reminder)s?\b",
                r"|\bzip\s*:",
            )),
            amount: vec![money_pattern(
                r"(?i)\b(?:installment|instalment|payment)\s+of\s+{MONEY}",
            )],
            autopay_on: Vec::new(),
        },
        ProviderPatterns {
            provider: Provider::Sezzle,
            detect: pattern(r"(?i)\bsezzle\b"),
            amount: vec![
                money_pattern(r"(?i)\b(?:installment|instalment|payment)\s+of\s+{MONEY}"),
                money_pattern(r"(?i){MONEY}\s+(?:installment|payment)\s+(?:is\s+)?(?:due|scheduled)\b"),
            ],
            autopay_on: Vec::new(),
        },
    ]
}

pub fn provider_patterns() -> &'static [ProviderPatterns] {
    static PATTERNS: OnceLock<Vec<ProviderPatterns>> = OnceLock::new();
    PATTERNS.get_or_init(create_provider_patterns)
}

pub fn patterns_for(provider: Provider) -> &'static ProviderPatterns {
    provider_patterns()
        .iter()
        .find(|p| p.provider == provider)
        .expect("every provider has a pattern table")
}

/// Phrasing shared by all providers for labelled amounts
pub fn common_amount_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            money_pattern(
                r"(?i)\b(?:amount\s+due|payment\s+amount|installment\s+amount|instalment\s+amount|amount)\s*:\s*{MONEY}",
            ),
            money_pattern(r"(?i)\bdue\s*:\s*{MONEY}"),
        ]
    })
}

/// Any amount with an explicit currency marker
pub fn any_money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| money_pattern(r"{MONEY}"))
}

pub fn late_fee_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        money_pattern(r"(?i)\blate\s+fees?\s*(?:of|:)?\s*(?:up\s+to\s+)?(?:a\s+maximum\s+of\s+)?{MONEY}")
    })
}

/// "payment 2 of 4", "2nd of 4", "1 of 4 payments"
pub fn installment_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        pattern(concat!(
            r"(?i)(?:^|[^\d.,$€£])(?P<no>\d{1,3})(?:st|nd|rd|th)?\s+",
            r"(?:(?:payment|installment|instalment)\s+)?of\s+(?P<total>\d{1,3})\b",
        ))
    })
}

/// "Payment #2 of 4" with the label before the number
pub fn labelled_installment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        pattern(r"(?i)\b(?:payment|installment|instalment)\s*#?\s*(?P<no>\d{1,3})\s+(?:of|/)\s+(?P<total>\d{1,3})\b")
    })
}

/// "2/4", never the first two parts of a slash date
pub fn installment_slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        pattern(r"(?:^|[^\d/.,$€£])(?P<no>\d{1,2})\s?/\s?(?P<total>\d{1,2})(?:[^\d/]|$)")
    })
}

/// Explicit statements that autopay is off. Checked before the "on" set.
pub fn autopay_off_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            pattern(concat!(
                r"(?i)\b(?:auto[\s-]?pay|automatic\s+payments?)\s+(?:is\s+|are\s+|has\s+been\s+)?",
                r"(?:currently\s+)?(?:off|disabled|turned\s+off|inactive|not\s+(?:enabled|active|on|set\s+up|turned\s+on))\b",
            )),
            pattern(r"(?i)\b(?:auto[\s-]?pay|automatic\s+payments?)\s*:\s*(?:off|disabled|no|inactive)\b"),
            pattern(concat!(
                r"(?i)\b(?:not|won't|will\s+not|isn't|is\s+not)\s+(?:be\s+)?",
                r"(?:automatically\s+(?:charged|debited|deducted|collected|paid)|charged\s+automatically)\b",
            )),
            pattern(r"(?i)\b(?:turned\s+off|disabled|cancell?ed)\s+(?:your\s+)?(?:auto[\s-]?pay|automatic\s+payments?)\b"),
            pattern(r"(?i)\b(?:no|without)\s+(?:auto[\s-]?pay|automatic\s+payments?)\b"),
            pattern(r"(?i)\b(?:pay|make\s+(?:this|your|the)\s+payment)\s+manually\b"),
        ]
    })
}

/// Explicit statements that autopay is on
pub fn autopay_on_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            pattern(concat!(
                r"(?i)\b(?:auto[\s-]?pay|automatic\s+payments?)\s+(?:is\s+|are\s+|has\s+been\s+)?",
                r"(?:currently\s+)?(?:on|enabled|active|turned\s+on|set\s+up)\b",
            )),
            pattern(r"(?i)\b(?:auto[\s-]?pay|automatic\s+payments?)\s*:\s*(?:on|enabled|yes|active)\b"),
            pattern(r"(?i)\bautomatically\s+(?:be\s+)?(?:charged|debited|deducted|collected|charge|debit|deduct|collect)\b"),
            pattern(r"(?i)\bcharged\s+automatically\b"),
            pattern(concat!(
                r"(?i)\b(?:we(?:'ll|\s+will)|will)\s+(?:automatically\s+)?(?:charge|debit)\s+your\s+",
                r"(?:card|account|bank\s+account|payment\s+method)\s+(?:for|with)\s+",
                r"(?:this|your|the|each|every)\s+(?:payment|installment|instalment)s?\b",
            )),
        ]
    })
}
