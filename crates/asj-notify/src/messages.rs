//! Rendering of the post-show results messages.

use asj_money::Cents;

/// One piece a bidder won, ready for display.
#[derive(Debug, Clone)]
pub struct WonLine {
    pub piece_code: String,
    pub piece_name: String,
    pub amount: Cents,
}

/// Everything the results message for one bidder says.
#[derive(Debug, Clone)]
pub struct ResultsSummary {
    pub bidder_name: String,
    pub won: Vec<WonLine>,
    pub outbid_count: i64,
    pub voice_auction_count: i64,
}

pub fn results_subject(show_name: &str) -> String {
    format!("{show_name} results")
}

/// Plain-text body, shared by email and Telegram.
pub fn results_body(show_name: &str, summary: &ResultsSummary) -> String {
    let mut lines = vec![format!("Hello {},", summary.bidder_name), String::new()];

    if summary.won.is_empty() {
        lines.push(format!(
            "You did not win any pieces in the {show_name} art show."
        ));
    } else {
        lines.push(format!(
            "You won {} piece{} in the {show_name} art show:",
            summary.won.len(),
            if summary.won.len() == 1 { "" } else { "s" },
        ));
        for w in &summary.won {
            lines.push(format!("  {}  {}  ${}", w.piece_code, w.piece_name, w.amount));
        }
        lines.push(String::new());
        lines.push(
            "Please come to the art show cashier to pay for and collect your pieces."
                .to_string(),
        );
    }

    if summary.outbid_count > 0 {
        lines.push(String::new());
        lines.push(format!(
            "You were outbid on {} piece{}.",
            summary.outbid_count,
            if summary.outbid_count == 1 { "" } else { "s" },
        ));
    }
    if summary.voice_auction_count > 0 {
        lines.push(String::new());
        lines.push(format!(
            "{} piece{} you hold the top bid on {} to the voice auction.",
            summary.voice_auction_count,
            if summary.voice_auction_count == 1 { "" } else { "s" },
            if summary.voice_auction_count == 1 {
                "goes"
            } else {
                "go"
            },
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_body_lists_pieces() {
        let summary = ResultsSummary {
            bidder_name: "Pat".to_string(),
            won: vec![WonLine {
                piece_code: "12-3".to_string(),
                piece_name: "Sunrise".to_string(),
                amount: Cents::from_dollars(40),
            }],
            outbid_count: 2,
            voice_auction_count: 0,
        };
        let body = results_body("Concordia 2026", &summary);
        assert!(body.contains("You won 1 piece in the Concordia 2026 art show:"));
        assert!(body.contains("12-3  Sunrise  $40.00"));
        assert!(body.contains("outbid on 2 pieces."));
        assert!(!body.contains("voice auction"));
    }

    #[test]
    fn non_winner_body() {
        let summary = ResultsSummary {
            bidder_name: "Sam".to_string(),
            won: vec![],
            outbid_count: 0,
            voice_auction_count: 1,
        };
        let body = results_body("Concordia 2026", &summary);
        assert!(body.contains("did not win any pieces"));
        assert!(body.contains("1 piece you hold the top bid on goes to the voice auction."));
    }
}
