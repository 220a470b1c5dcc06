//! Print the engine invocation for a request without running it.

use unmark_common::config::AppConfig;
use unmark_media_model::Rectangle;
use unmark_pipeline::PlanBuilder;

pub fn run(
    config: &AppConfig,
    region: Option<Rectangle>,
    with_audio: bool,
    json: bool,
) -> anyhow::Result<()> {
    let region = region.unwrap_or(Rectangle::EMPTY);
    let plan = PlanBuilder::new(config.encoding.clone())
        .build(&region, with_audio)
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Plan: {}", plan.kind().as_str());
    for input in plan.inputs() {
        println!("  Input: {} <- {}", input.staged_name, input.role);
    }
    println!("  Output: {}", plan.output_name());
    println!();
    println!("ffmpeg {}", shell_join(&plan.to_args()));
    Ok(())
}

/// Quote arguments so the printed line can be pasted into a shell.
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_.:/=,".contains(c));
            if plain {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_join_quotes_filter_graphs() {
        let args = vec![
            "-i".to_string(),
            "input.mp4".to_string(),
            "[0:v]delogo=x=1:y=2:w=3:h=4[v]".to_string(),
        ];
        assert_eq!(
            shell_join(&args),
            "-i input.mp4 '[0:v]delogo=x=1:y=2:w=3:h=4[v]'"
        );
    }
}
