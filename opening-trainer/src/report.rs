use trainer::AnalysisReport;

pub fn print_report(report: &AnalysisReport) {
    print!("{}", format_report(report));
}

fn format_report(report: &AnalysisReport) -> String {
    if let Some(error) = &report.error {
        return format!("Analysis failed: {}\n", error);
    }

    let mut out = format!(
        "Games analyzed: {}\nDeviations: {}\nUnique mistakes: {}\n",
        report.total_games,
        report.total_deviations,
        report.unique_mistakes()
    );

    for (opening, details) in report.by_opening() {
        out.push_str(&format!("\n{} ({} deviations)\n", opening, details.len()));
        for detail in details {
            out.push_str(&format!(
                "  {} vs {} ({}, {}): {} played {}, book {}\n",
                detail.white,
                detail.black,
                detail.date,
                detail.result,
                detail.position_description(),
                detail.user_move,
                detail.correct_moves.join(" / ")
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Side;
    use trainer::DeviationDetail;

    fn detail(opening: &str) -> DeviationDetail {
        DeviationDetail {
            opening_id: 1,
            opening_name: opening.to_string(),
            opening_side: Side::White,
            event: "Casual".to_string(),
            white: "alice".to_string(),
            black: "bob".to_string(),
            date: "2024.05.01".to_string(),
            result: "1-0".to_string(),
            site: "?".to_string(),
            user_color: Side::White,
            fen: "8/8/8/8/8/8/8/8 w - - 0 3".to_string(),
            user_move: "f1b5".to_string(),
            correct_moves: vec!["f1c4".to_string(), "d2d4".to_string()],
            move_number: 3,
        }
    }

    #[test]
    fn groups_deviations_by_opening() {
        let report = AnalysisReport {
            total_games: 3,
            total_deviations: 2,
            deviations: vec![detail("Italian"), detail("Italian")],
            ..AnalysisReport::default()
        };
        let text = format_report(&report);
        assert!(text.starts_with("Games analyzed: 3\nDeviations: 2\nUnique mistakes: 0\n"));
        assert!(text.contains("Italian (2 deviations)"));
        assert!(text.contains("white to move, move 3 played f1b5, book f1c4 / d2d4"));
    }

    #[test]
    fn failure_is_reported() {
        let report = AnalysisReport {
            error: Some("service down".to_string()),
            ..AnalysisReport::default()
        };
        assert_eq!(format_report(&report), "Analysis failed: service down\n");
    }
}
