use script_address_indexer::blockchain::address::{self, Credential, Network};
use script_address_indexer::blockchain::script;

/// Usage: test_derivation <script_ref_hex> <delegation_hash_hex> [mainnet]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let script_ref = args.next().ok_or("missing script reference hex")?;
    let delegation_hash = args.next().ok_or("missing delegation script hash")?;
    let network = Network::from_mainnet_flag(args.next().as_deref() == Some("mainnet"));

    println!("Decoding script reference...");
    let script = script::decode_script_ref_hex(&script_ref)?;
    println!("✅ Decoded {:?} script ({} bytes)", script.language(), script.body().len());

    if !script.is_plutus_v3() {
        println!("❌ Not a Plutus V3 script, the indexer would skip it");
        return Ok(());
    }

    let payment = Credential::from_script_hash(&script.hash()?)?;
    let delegation = Credential::from_script_hash_hex(&delegation_hash)?;

    let base = address::base_address(&payment, &delegation, network)?;
    let reward = address::reward_address(&script, network)?;

    println!("Payment credential: {}", payment.to_hex());
    println!("Base address:       {}", base);
    println!("Stake address:      {}", reward.bech32);

    Ok(())
}
