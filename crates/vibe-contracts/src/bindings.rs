//! Solidity bindings for the VibeMarket contracts.

use alloy_sol_types::sol;

sol! {
	/// Card seed contract. All functions are pure: identical seeds always
	/// produce identical labels.
	#[derive(Debug, PartialEq, Eq)]
	interface ICardSeed {
		function wearFromSeed(bytes32 seed) external pure returns (string wear);
		function getFoilMappingFromSeed(bytes32 seed) external pure returns (string foil);
		function getCardSeedData(bytes32 seed) external pure returns (string wear, string foil);
	}

	/// Drop token contract purchases are sent to.
	#[derive(Debug, PartialEq, Eq)]
	interface IDropToken {
		function getBuyQuote(uint256 tokenAmount) external view returns (uint256 ethCost);
		function buy(uint256 tokenAmount, address recipient, address referrer, address originReferrer) external payable returns (uint256 tokensBought);
	}
}
