//! Per-dialect quoting and the fixed blocks of the integration script.

use std::path::Path;

use super::ShellType;

const SUBCOMMANDS: &str = "use unuse add remove list shell status state check";

/// Body of a POSIX double-quoted string.
pub fn escape_posix(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Body of a PowerShell double-quoted string. The backtick is the escape
/// character, so it has to be doubled before anything else is escaped.
pub fn escape_powershell(value: &str) -> String {
    value
        .replace('`', "``")
        .replace('"', "`\"")
        .replace('$', "`$")
}

/// Value for an unquoted `set NAME=value` line in a batch file.
pub fn escape_cmd(value: &str) -> String {
    value
        .replace('^', "^^")
        .replace('%', "%%")
        .replace('&', "^&")
        .replace('|', "^|")
        .replace('<', "^<")
        .replace('>', "^>")
}

/// A complete fish single-quoted word.
pub fn quote_fish(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// A complete POSIX single-quoted word.
pub fn quote_posix_single(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// A complete PowerShell single-quoted string.
pub fn quote_powershell_single(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn header(shell: ShellType) -> String {
    match shell {
        ShellType::Cmd => format!(
            "@echo off\n@REM ktenv shell integration ({})\n@REM Generated by ktenv, do not edit\n",
            shell
        ),
        _ => format!(
            "# ktenv shell integration ({})\n# Generated by ktenv, do not edit\n",
            shell
        ),
    }
}

/// The `ktenv` wrapper: `use`/`unuse` output is evaluated in the current
/// shell, every other subcommand runs as-is.
pub fn dispatcher(shell: ShellType, program: &str) -> String {
    match shell {
        ShellType::Bash | ShellType::Zsh => posix_dispatcher(shell, program),
        ShellType::Fish => fish_dispatcher(program),
        ShellType::PowerShell => powershell_dispatcher(program),
        ShellType::Cmd => cmd_dispatcher(),
    }
}

fn posix_dispatcher(shell: ShellType, program: &str) -> String {
    let program = quote_posix_single(program);
    format!(
        r#"ktenv() {{
    case "$1" in
        use|unuse)
            local __ktenv_script
            __ktenv_script="$(command {program} "$@" --shell {shell})" || return $?
            eval "$__ktenv_script"
            ;;
        *)
            command {program} "$@"
            ;;
    esac
}}

if command -v complete >/dev/null 2>&1; then
    complete -W "{SUBCOMMANDS}" ktenv
fi
"#
    )
}

fn fish_dispatcher(program: &str) -> String {
    let program = quote_fish(program);
    format!(
        r#"function ktenv
    switch "$argv[1]"
        case use unuse
            set -l __ktenv_script (command {program} $argv --shell fish); or return $status
            string join \n -- $__ktenv_script | source
        case '*'
            command {program} $argv
    end
end

complete -c ktenv -f -n __fish_use_subcommand -a "{SUBCOMMANDS}"
"#
    )
}

fn powershell_dispatcher(program: &str) -> String {
    let program = quote_powershell_single(program);
    format!(
        r#"function ktenv {{
    $ktenvExe = Get-Command -CommandType Application -Name {program} | Select-Object -First 1
    $ktenvArgs = @($args)
    if ($ktenvArgs.Count -gt 0 -and @('use', 'unuse') -contains $ktenvArgs[0]) {{
        $ktenvScript = & $ktenvExe @ktenvArgs --shell pwsh | Out-String
        if ($LASTEXITCODE -ne 0) {{ return }}
        if ($ktenvScript) {{ Invoke-Expression $ktenvScript }}
    }} else {{
        & $ktenvExe @ktenvArgs
    }}
}}

Register-ArgumentCompleter -Native -CommandName ktenv -ScriptBlock {{
    param($wordToComplete, $commandAst, $cursorPosition)
    '{SUBCOMMANDS}'.Split(' ') | Where-Object {{ $_ -like "$wordToComplete*" }}
}}
"#
    )
}

/// Batch files cannot define functions: the script re-enters itself through a
/// doskey macro and jumps to the routine from [`cmd_dispatch_routine`].
fn cmd_dispatcher() -> String {
    "if \"%~1\"==\":ktenv\" goto :ktenv_dispatch\ndoskey ktenv=call \"%~f0\" :ktenv $*\n".to_string()
}

/// Trailing routine of the cmd integration script. Must come after every
/// other statement since it starts with `goto :eof`.
pub fn cmd_dispatch_routine(program: &str) -> String {
    let program = format!("\"{program}\"");
    format!(
        r#"goto :eof

:ktenv_dispatch
shift
if /i "%~1"=="use" goto :ktenv_eval
if /i "%~1"=="unuse" goto :ktenv_eval
{program} %1 %2 %3 %4 %5 %6 %7 %8 %9
goto :eof

:ktenv_eval
set "KTENV_SCRIPT=%TEMP%\ktenv-%RANDOM%.cmd"
{program} %1 %2 %3 %4 %5 %6 %7 %8 %9 --shell cmd > "%KTENV_SCRIPT%"
if errorlevel 1 (
    del "%KTENV_SCRIPT%" >nul 2>&1
    exit /b 1
)
call "%KTENV_SCRIPT%"
del "%KTENV_SCRIPT%" >nul 2>&1
set "KTENV_SCRIPT="
goto :eof
"#
    )
}

/// Source every dialect-specific script found in `dir`.
pub fn custom_scripts(shell: ShellType, dir: &Path) -> String {
    let dir = dir.to_string_lossy();
    match shell {
        ShellType::Bash => format!(
            r#"if [ -d "{dir}" ]; then
    for __ktenv_file in "{dir}"/*.sh; do
        [ -f "$__ktenv_file" ] && . "$__ktenv_file"
    done
    unset __ktenv_file
fi
"#,
            dir = escape_posix(&dir)
        ),
        ShellType::Zsh => format!(
            r#"if [ -d "{dir}" ]; then
    for __ktenv_file in "{dir}"/*.sh(N); do
        . "$__ktenv_file"
    done
    unset __ktenv_file
fi
"#,
            dir = escape_posix(&dir)
        ),
        ShellType::Fish => format!(
            r#"if test -d {dir}
    for __ktenv_file in {dir}/*.fish
        source $__ktenv_file
    end
end
"#,
            dir = quote_fish(&dir)
        ),
        ShellType::PowerShell => format!(
            r#"$ktenvCustomDir = {dir}
if (Test-Path -LiteralPath $ktenvCustomDir) {{
    Get-ChildItem -LiteralPath $ktenvCustomDir -Filter '*.ps1' | ForEach-Object {{ . $_.FullName }}
}}
"#,
            dir = quote_powershell_single(&dir)
        ),
        ShellType::Cmd => format!(
            r#"if exist "{dir}\*.cmd" for %%f in ("{dir}\*.cmd") do call "%%~f"
if exist "{dir}\*.bat" for %%f in ("{dir}\*.bat") do call "%%~f"
"#,
            dir = escape_cmd(&dir)
        ),
    }
}

/// Profile snippet that loads the integration on shell startup.
pub fn activation_hint(shell: ShellType) -> String {
    match shell {
        ShellType::Bash => "# Add to ~/.bashrc:\neval \"$(ktenv shell bash)\"".to_string(),
        ShellType::Zsh => "# Add to ~/.zshrc:\neval \"$(ktenv shell zsh)\"".to_string(),
        ShellType::Fish => {
            "# Add to ~/.config/fish/config.fish:\nktenv shell fish | source".to_string()
        }
        ShellType::PowerShell => {
            "# Add to $PROFILE:\nInvoke-Expression (& ktenv shell pwsh | Out-String)".to_string()
        }
        ShellType::Cmd => concat!(
            "REM Save the integration script and call it from your AutoRun script:\n",
            "ktenv shell cmd > \"%USERPROFILE%\\.ktenv\\ktenv_init.cmd\"\n",
            "call \"%USERPROFILE%\\.ktenv\\ktenv_init.cmd\""
        )
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_posix() {
        assert_eq!(escape_posix(r#"a "b" $c `d` \e"#), r#"a \"b\" \$c \`d\` \\e"#);
    }

    #[test]
    fn test_escape_powershell_escapes_backtick_first() {
        assert_eq!(escape_powershell("`$x\""), "```$x`\"");
    }

    #[test]
    fn test_escape_cmd() {
        assert_eq!(escape_cmd("50% & a|b <c> ^"), "50%% ^& a^|b ^<c^> ^^");
    }

    #[test]
    fn test_single_quoting() {
        assert_eq!(quote_posix_single("it's"), r#"'it'\''s'"#);
        assert_eq!(quote_fish(r"it's \o/"), r"'it\'s \\o/'");
        assert_eq!(quote_powershell_single("it's"), "'it''s'");
    }

    #[test]
    fn test_cmd_routine_follows_goto_eof() {
        let routine = cmd_dispatch_routine("C:\\ktenv\\ktenv.exe");
        assert!(routine.starts_with("goto :eof"));
        assert!(routine.contains("\"C:\\ktenv\\ktenv.exe\" %1 %2 %3 %4 %5 %6 %7 %8 %9 --shell cmd"));
    }
}
