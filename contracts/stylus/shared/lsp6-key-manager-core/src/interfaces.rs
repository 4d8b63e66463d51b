//! ABI of the contracts a key manager talks to, and of the key manager itself.

use alloy_primitives::{fixed_bytes, FixedBytes};
use alloy_sol_types::sol;

sol! {
    interface IERC725Y {
        function getData(bytes32 dataKey) external view returns (bytes memory dataValue);
        function getDataBatch(bytes32[] memory dataKeys) external view returns (bytes[] memory dataValues);
        function setData(bytes32 dataKey, bytes memory dataValue) external payable;
        function setDataBatch(bytes32[] memory dataKeys, bytes[] memory dataValues) external payable;
    }

    interface IERC725X {
        function execute(uint256 operationType, address target, uint256 value, bytes memory data) external payable returns (bytes memory);
        function executeBatch(uint256[] memory operationsType, address[] memory targets, uint256[] memory values, bytes[] memory datas) external payable returns (bytes[] memory);
    }

    interface ILSP14Ownable2Step {
        function transferOwnership(address newOwner) external;
        function acceptOwnership() external;
        function renounceOwnership() external;
    }

    interface IERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }

    interface ILSP6KeyManager {
        function target() external view returns (address);
        function getNonce(address from, uint128 channelId) external view returns (uint256);
        function isValidSignature(bytes32 dataHash, bytes memory signature) external view returns (bytes4);
        function execute(bytes calldata payload) external payable returns (bytes memory);
        function executeBatch(uint256[] calldata values, bytes[] calldata payloads) external payable returns (bytes[] memory);
        function executeRelayCall(bytes calldata signature, uint256 nonce, uint256 validityTimestamps, bytes calldata payload) external payable returns (bytes memory);
        function executeRelayCallBatch(bytes[] calldata signatures, uint256[] calldata nonces, uint256[] calldata validityTimestamps, uint256[] calldata values, bytes[] calldata payloads) external payable returns (bytes[] memory);
    }

    interface ILSP20CallVerifier {
        function lsp20VerifyCall(address requestor, address target, address caller, uint256 value, bytes memory callData) external returns (bytes4);
        function lsp20VerifyCallResult(bytes32 callHash, bytes memory callResult) external returns (bytes4);
    }
}

/// ERC1271 `isValidSignature` success value.
pub const ERC1271_MAGIC_VALUE: FixedBytes<4> = fixed_bytes!("1626ba7e");
/// ERC1271 failure value.
pub const ERC1271_FAIL_VALUE: FixedBytes<4> = fixed_bytes!("ffffffff");

/// `lsp20VerifyCall` return: call allowed, `lsp20VerifyCallResult` must follow.
pub const LSP20_VERIFY_CALL_WITH_POST_VERIFICATION: FixedBytes<4> = fixed_bytes!("de928f01");
/// `lsp20VerifyCall` return: call allowed, no post-verification.
pub const LSP20_VERIFY_CALL_WITHOUT_POST_VERIFICATION: FixedBytes<4> = fixed_bytes!("de928f00");
/// `lsp20VerifyCallResult` success value.
pub const LSP20_VERIFY_CALL_RESULT_MAGIC_VALUE: FixedBytes<4> = fixed_bytes!("d3fc45d3");

