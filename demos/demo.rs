/* demos/demo.rs */

use real_proxy::{
    ProxyResolver, RequestInfo, TrustSpec, all_addresses, compile_trust, forwarded_addresses,
    parse, parse_v4, resolve,
};
use std::collections::HashMap;

fn main() {
    println!("=== Real Proxy Examples ===\n");

    // Example 1: Legacy IPv4 notations
    example_1_notations();

    // Example 2: Range classification
    example_2_ranges();

    // Example 3: Building the forwarded chain
    example_3_chain();

    // Example 4: Trusting proxies by subnet and alias
    example_4_trust();

    // Example 5: Custom predicate
    example_5_predicate();

    // Example 6: Reusable resolver over a header map
    example_6_resolver();

    println!("=== All examples completed! ===");
}

fn example_1_notations() {
    println!("Example 1: Legacy IPv4 notations");

    for text in ["192.168.1.1", "0xc0a80101", "3232235777", "030052000401", "192.0250.1.1"] {
        match parse_v4(text, None) {
            Ok(addr) => println!("  {:<14} -> {}", text, addr),
            Err(err) => println!("  {:<14} -> {}", text, err),
        }
    }
    println!();
}

fn example_2_ranges() {
    println!("Example 2: Range classification");

    for text in ["127.0.0.1", "10.1.2.3", "240.1.2.3", "fc00::", "::ffff:10.0.0.1", "8.8.8.8"] {
        match parse(text) {
            Ok(addr) => println!("  {:<16} {}", text, addr.range()),
            Err(err) => println!("  {:<16} {}", text, err),
        }
    }
    println!();
}

fn example_3_chain() {
    println!("Example 3: Building the forwarded chain");

    let req = RequestInfo::new("127.0.0.1", Some("203.0.113.1, 10.0.0.2, 10.0.0.1".to_string()));
    println!("  X-Forwarded-For: {}", req.forwarded_for.as_deref().unwrap_or(""));
    println!("  Chain (nearest first): {:?}", forwarded_addresses(&req));
    println!();
}

fn example_4_trust() {
    println!("Example 4: Trusting proxies by subnet and alias");

    let req = RequestInfo::new("127.0.0.1", Some("203.0.113.1, 10.0.0.2".to_string()));

    for spec in [
        TrustSpec::from("loopback"),
        TrustSpec::from(["loopback", "10.0.0.0/8"]),
        TrustSpec::from(["loopback", "10.0.0.0/255.0.0.0"]),
    ] {
        let label = format!("{:?}", spec);
        match resolve(&req, spec) {
            Ok(ip) => println!("  {} -> {}", label, ip),
            Err(err) => println!("  {} -> error: {}", label, err),
        }
    }

    match resolve(&req, "10.0.0.1/6000") {
        Ok(ip) => println!("  unexpected: {}", ip),
        Err(err) => println!("  invalid spec rejected: {}", err),
    }
    println!();
}

fn example_5_predicate() {
    println!("Example 5: Custom predicate");

    let req = RequestInfo::new("10.0.0.1", Some("10.0.0.3, 192.168.0.1, 10.0.0.2".to_string()));
    let first_hop_only = TrustSpec::predicate(|_, index| index == 1);

    match all_addresses(&req, Some(first_hop_only)) {
        Ok(chain) => println!("  Kept chain: {:?}", chain),
        Err(err) => println!("  Error: {}", err),
    }
    println!();
}

fn example_6_resolver() {
    println!("Example 6: Reusable resolver over a header map");

    let mut headers = HashMap::new();
    headers.insert(
        "x-forwarded-for".to_string(),
        "198.51.100.4, 172.16.0.9".to_string(),
    );

    let trust = match compile_trust("uniquelocal") {
        Ok(trust) => trust,
        Err(err) => {
            println!("  Error: {}", err);
            return;
        }
    };
    let resolver = ProxyResolver::new().with_compiled_trust(trust);

    for peer in ["10.0.0.1", "203.0.113.50"] {
        println!("  peer {:<13} -> {}", peer, resolver.resolve(&headers, peer));
    }
    println!();
}
