//! Month-name recognition for calendar headers.
//!
//! Source tables spell month names inconsistently (Moroccan and Mashriqi
//! Arabic, French, English, with or without hamza), so lookups fall back to
//! an edit-distance match when no exact spelling is known.

const MAX_EDIT_DISTANCE: usize = 2;

/// Spellings per Gregorian month, index 0 = January.
const SOLAR_MONTHS: [&[&str]; 12] = [
    &["يناير", "جانفي", "كانون الثاني", "janvier", "january", "jan"],
    &["فبراير", "فيفري", "شباط", "février", "fevrier", "february", "feb"],
    &["مارس", "آذار", "mars", "march"],
    &["أبريل", "ابريل", "إبريل", "أفريل", "نيسان", "avril", "april", "apr"],
    &["ماي", "مايو", "أيار", "mai", "may"],
    &["يونيو", "يونيه", "جوان", "حزيران", "juin", "june"],
    &["يوليوز", "يوليو", "يوليه", "جويلية", "تموز", "juillet", "july"],
    &["غشت", "أغسطس", "اغسطس", "أوت", "آب", "août", "aout", "august", "aug"],
    &["شتنبر", "سبتمبر", "أيلول", "septembre", "september", "sept"],
    &["أكتوبر", "اكتوبر", "تشرين الأول", "octobre", "october", "oct"],
    &["نونبر", "نوفمبر", "تشرين الثاني", "novembre", "november", "nov"],
    &["دجنبر", "ديسمبر", "كانون الأول", "décembre", "decembre", "december", "dec"],
];

/// Arabic spellings of each Hijri month with its transliteration.
const HIJRI_MONTHS: [(&[&str], &str); 12] = [
    (&["محرم", "محرم الحرام"], "Muharram"),
    (&["صفر", "صفر الخير"], "Safar"),
    (&["ربيع الأول", "ربيع الاول", "ربيع الأنور"], "Rabi' al-Awwal"),
    (&["ربيع الثاني", "ربيع الآخر", "ربيع الاخر"], "Rabi' al-Thani"),
    (&["جمادى الأولى", "جمادى الاولى", "جمادى الأول"], "Jumada al-Awwal"),
    (&["جمادى الثانية", "جمادى الآخرة", "جمادى الاخرة"], "Jumada al-Thani"),
    (&["رجب", "رجب الفرد"], "Rajab"),
    (&["شعبان", "شعبان الأبرك"], "Sha'ban"),
    (&["رمضان", "رمضان المعظم", "رمضان المبارك"], "Ramadan"),
    (&["شوال", "شوال الأبرك"], "Shawwal"),
    (&["ذو القعدة", "ذي القعدة"], "Dhu al-Qi'dah"),
    (&["ذو الحجة", "ذي الحجة"], "Dhu al-Hijjah"),
];

/// Lowercases and drops digits, punctuation and surrounding whitespace.
fn normalize(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index into `table` for `name`: exact first, then unique within the edit distance.
fn lookup<'a, I>(name: &str, table: I) -> Option<usize>
where
    I: Iterator<Item = &'a [&'a str]> + Clone,
{
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    if let Some(idx) = table
        .clone()
        .position(|spellings| spellings.iter().any(|s| normalize(s) == needle))
    {
        return Some(idx);
    }

    let mut candidates = table.enumerate().filter_map(|(idx, spellings)| {
        spellings
            .iter()
            .any(|s| strsim::levenshtein(&normalize(s), &needle) <= MAX_EDIT_DISTANCE)
            .then_some(idx)
    });
    match (candidates.next(), candidates.next()) {
        (Some(idx), None) => Some(idx),
        _ => None,
    }
}

/// Gregorian month number (1..=12) for a spelled month name.
pub fn solar_month_number(name: &str) -> Option<u32> {
    lookup(name, SOLAR_MONTHS.iter().copied()).map(|idx| idx as u32 + 1)
}

/// Transliteration for a Hijri month label such as `"رمضان 1447"`.
pub fn hijri_transliteration(label: &str) -> Option<&'static str> {
    let needle = normalize(label);
    // Longest contained spelling wins.
    let mut contained: Option<(usize, usize)> = None;
    for (idx, (spellings, _)) in HIJRI_MONTHS.iter().enumerate() {
        for spelling in spellings.iter() {
            let s = normalize(spelling);
            if needle.contains(&s) && contained.is_none_or(|(_, len)| s.chars().count() > len) {
                contained = Some((idx, s.chars().count()));
            }
        }
    }
    if let Some((idx, _)) = contained {
        return Some(HIJRI_MONTHS[idx].1);
    }
    lookup(label, HIJRI_MONTHS.iter().map(|(spellings, _)| *spellings))
        .map(|idx| HIJRI_MONTHS[idx].1)
}

/// Splits a header cell listing one or two months.
pub fn split_month_list(label: &str) -> Vec<String> {
    label
        .split(['/', ',', ';', '،'])
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
