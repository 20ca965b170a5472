//! Line attribution for a commit

/// How a commit's added lines split between agent and human
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attribution {
    pub total_lines: usize,
    pub agent_lines: usize,
    pub human_lines: usize,
    pub agent_percent: u8,
}

/// Attribute added lines per file
///
/// Without finer-grained tracking, every line counts as the agent's when an
/// agent session was active at pre-commit time, and as human otherwise.
pub fn calculate<I>(added_per_file: I, agent_active: bool) -> Attribution
where
    I: IntoIterator<Item = usize>,
{
    let total_lines: usize = added_per_file.into_iter().sum();
    if agent_active {
        Attribution {
            total_lines,
            agent_lines: total_lines,
            human_lines: 0,
            agent_percent: 100,
        }
    } else {
        Attribution {
            total_lines,
            agent_lines: 0,
            human_lines: total_lines,
            agent_percent: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_active() {
        let result = calculate([10, 5, 0], true);
        assert_eq!(result.total_lines, 15);
        assert_eq!(result.agent_lines, 15);
        assert_eq!(result.human_lines, 0);
        assert_eq!(result.agent_percent, 100);
    }

    #[test]
    fn test_human_only() {
        let result = calculate(vec![3, 4], false);
        assert_eq!(result.total_lines, 7);
        assert_eq!(result.human_lines, 7);
        assert_eq!(result.agent_percent, 0);
    }

    #[test]
    fn test_empty_commit() {
        assert_eq!(calculate([], true).total_lines, 0);
        assert_eq!(calculate([], true).agent_percent, 100);
    }
}
