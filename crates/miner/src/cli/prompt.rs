use crate::error::MinerError;
use shared::models::{CoinDefinition, COIN_CATALOG};
use std::io::{self, BufRead, Write};

pub enum Selection {
    Coin(&'static CoinDefinition),
    NotANumber,
    OutOfRange,
}

/// Maps a 1-based menu choice onto the coin catalog.
pub fn parse_coin_choice(choice: &str) -> Selection {
    match choice.trim().parse::<usize>() {
        Ok(n) if (1..=COIN_CATALOG.len()).contains(&n) => Selection::Coin(&COIN_CATALOG[n - 1]),
        Ok(_) => Selection::OutOfRange,
        Err(_) => Selection::NotANumber,
    }
}

pub fn print_coin_menu<W: Write>(output: &mut W) -> io::Result<()> {
    writeln!(output, "\nAvailable coins:")?;
    for (idx, coin) in COIN_CATALOG.iter().enumerate() {
        writeln!(output, "{}. {} ({})", idx + 1, coin.id, coin.symbol)?;
    }
    Ok(())
}

fn read_line<R: BufRead>(input: &mut R) -> Result<String, MinerError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(MinerError::InvalidInput("input closed".to_string()));
    }
    Ok(line.trim().to_string())
}

/// Shows the numbered coin list and asks until a valid number is entered.
pub fn select_coin<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<&'static CoinDefinition, MinerError> {
    print_coin_menu(output)?;

    loop {
        write!(output, "\nSelect coin number to mine: ")?;
        output.flush()?;

        match parse_coin_choice(&read_line(input)?) {
            Selection::Coin(coin) => return Ok(coin),
            Selection::OutOfRange => writeln!(output, "Invalid selection. Please try again.")?,
            Selection::NotANumber => writeln!(output, "Please enter a number.")?,
        }
    }
}

pub fn read_wallet<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String, MinerError> {
    write!(output, "Enter your wallet address: ")?;
    output.flush()?;

    let wallet = read_line(input)?;
    if wallet.is_empty() {
        return Err(MinerError::InvalidInput(
            "Wallet address cannot be empty".to_string(),
        ));
    }
    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_coin_choice() {
        assert!(matches!(parse_coin_choice("1"), Selection::Coin(c) if c.id == "MONERO"));
        assert!(matches!(parse_coin_choice(" 4 "), Selection::Coin(c) if c.id == "HAVEN"));
        assert!(matches!(parse_coin_choice("0"), Selection::OutOfRange));
        assert!(matches!(
            parse_coin_choice(&(COIN_CATALOG.len() + 1).to_string()),
            Selection::OutOfRange
        ));
        assert!(matches!(parse_coin_choice("monero"), Selection::NotANumber));
    }

    #[test]
    fn test_select_coin_retries_until_valid() {
        let mut input = Cursor::new("abc\n9\n5\n");
        let mut output = Vec::new();

        let coin = select_coin(&mut input, &mut output).unwrap();
        assert_eq!(coin.id, "CONCEAL");

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("1. MONERO (XMR)"));
        assert!(printed.contains("Please enter a number."));
        assert!(printed.contains("Invalid selection. Please try again."));
    }

    #[test]
    fn test_select_coin_input_closed() {
        let mut input = Cursor::new("");
        let result = select_coin(&mut input, &mut Vec::new());
        assert!(matches!(result, Err(MinerError::InvalidInput(_))));
    }

    #[test]
    fn test_read_wallet() {
        let mut input = Cursor::new("  44AFFq5kSiGBoZ  \n");
        assert_eq!(
            read_wallet(&mut input, &mut Vec::new()).unwrap(),
            "44AFFq5kSiGBoZ"
        );

        let mut empty = Cursor::new("\n");
        assert!(matches!(
            read_wallet(&mut empty, &mut Vec::new()),
            Err(MinerError::InvalidInput(_))
        ));
    }
}
