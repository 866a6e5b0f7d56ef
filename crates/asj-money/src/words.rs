use crate::Cents;

/// Render a non-negative amount the way a cheque spells it out:
/// `"one hundred and twenty-three dollars and forty-five cents"`.
///
/// Negative amounts are rendered by magnitude; the cheque layer negates
/// outbound amounts before printing, so the sign never appears here.
pub fn amount_in_words(amount: Cents) -> String {
    let (dollars, cents) = amount.parts();
    format!(
        "{} dollars and {} cents",
        number_in_words(dollars),
        number_in_words(cents)
    )
}

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

fn number_in_words(n: i64) -> String {
    debug_assert!(n >= 0);
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    if n < 100 {
        let tens = TENS[(n / 10) as usize];
        return if n % 10 == 0 {
            tens.to_string()
        } else {
            format!("{}-{}", tens, ONES[(n % 10) as usize])
        };
    }
    if n < 1_000 {
        let head = format!("{} hundred", ONES[(n / 100) as usize]);
        return if n % 100 == 0 {
            head
        } else {
            format!("{} and {}", head, number_in_words(n % 100))
        };
    }
    for (scale, name) in [(1_000_000_000, "billion"), (1_000_000, "million"), (1_000, "thousand")] {
        if n >= scale {
            let head = format!("{} {}", number_in_words(n / scale), name);
            let rest = n % scale;
            return if rest == 0 {
                head
            } else if rest < 100 {
                format!("{} and {}", head, number_in_words(rest))
            } else {
                format!("{} {}", head, number_in_words(rest))
            };
        }
    }
    unreachable!("scales cover all magnitudes above 1000")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_numbers() {
        assert_eq!(number_in_words(0), "zero");
        assert_eq!(number_in_words(7), "seven");
        assert_eq!(number_in_words(15), "fifteen");
    }

    #[test]
    fn tens_and_hyphenation() {
        assert_eq!(number_in_words(40), "forty");
        assert_eq!(number_in_words(42), "forty-two");
        assert_eq!(number_in_words(99), "ninety-nine");
    }

    #[test]
    fn hundreds() {
        assert_eq!(number_in_words(100), "one hundred");
        assert_eq!(number_in_words(123), "one hundred and twenty-three");
    }

    #[test]
    fn thousands() {
        assert_eq!(number_in_words(1_000), "one thousand");
        assert_eq!(number_in_words(2_045), "two thousand and forty-five");
        assert_eq!(
            number_in_words(12_345),
            "twelve thousand three hundred and forty-five"
        );
    }

    #[test]
    fn cheque_amount() {
        assert_eq!(
            amount_in_words(Cents::new(12_345)),
            "one hundred and twenty-three dollars and forty-five cents"
        );
        assert_eq!(
            amount_in_words(Cents::from_dollars(50)),
            "fifty dollars and zero cents"
        );
    }
}
